use courier_core::prelude::*;
use courier_examples::logging::init_logging;
use courier_examples::placeholder::{self, BASE, models};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let pipeline = RequestPipeline::builder(ReqwestTransport::default())
        .config(&PipelineConfig::default())?
        .retrier(BackoffRetrier::new(BackoffConfig::default()))
        .debug_level(DebugLevel::V)
        .build();

    let posts = TtlCache::<u32, models::Post>::open(CacheConfig {
        persist_on_drop: true,
        ..CacheConfig::named("placeholder-posts")
    })?;

    let post = match posts.get(&1) {
        Some(p) => {
            tracing::info!(id = p.id, "post served from cache");
            p
        }
        None => {
            let p: models::Post = pipeline
                .execute_typed(placeholder::get_post(BASE, 1))
                .await?
                .ok_or("empty response for post 1")?;
            posts.insert(p.id, p.clone());
            p
        }
    };
    println!("post {}: {}", post.id, post.title);

    let author: Option<models::User> = pipeline
        .request(placeholder::get_user(BASE, post.user_id))
        .timeout(Duration::from_secs(5))
        .decode()
        .await?;
    if let Some(user) = author {
        println!("written by {} <{}>", user.name, user.email);
    }

    let theirs: Vec<models::Post> = pipeline
        .execute_typed(placeholder::list_posts(BASE, Some(post.user_id)))
        .await?
        .unwrap_or_default();
    println!("user {} wrote {} posts", post.user_id, theirs.len());

    let new_post = models::NewPost {
        title: "courier".into(),
        body: "sent through the pipeline".into(),
        user_id: post.user_id,
    };
    let created: Option<models::Post> = pipeline
        .execute_typed(placeholder::create_post(BASE, &new_post))
        .await?;
    println!("created: {created:?}");

    let dir = std::env::temp_dir().join("courier-demo");
    tokio::fs::create_dir_all(&dir).await?;
    let dest = dir.join("posts.json");
    let (tx, rx) = tokio::sync::oneshot::channel();
    let handle = pipeline.download(
        url::Url::parse(&format!("{BASE}/posts"))?,
        None,
        &dest,
        Some(Arc::new(|p: Progress| {
            tracing::debug!(done = p.bytes_done, size = %p.size_display(), fraction = ?p.fraction(), "download progress");
        })),
        move |res| {
            let _ = tx.send(res);
        },
    );
    tracing::info!(id = %handle.id(), url = %handle.url(), "download started");
    match rx.await? {
        Ok(TransferOutput::Downloaded { path, bytes }) => {
            println!("downloaded {bytes} bytes to {}", path.display())
        }
        Ok(other) => println!("unexpected transfer output: {other:?}"),
        Err(e) => eprintln!("download failed: {e}"),
    }
    Ok(())
}
