//! Routes for the public JSONPlaceholder API.

use courier_core::prelude::*;

pub const BASE: &str = "https://jsonplaceholder.typicode.com";

pub mod models {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct Post {
        #[serde(rename = "userId")]
        pub user_id: u32,
        pub id: u32,
        pub title: String,
        pub body: String,
    }

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct NewPost {
        pub title: String,
        pub body: String,
        #[serde(rename = "userId")]
        pub user_id: u32,
    }

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct User {
        pub id: u32,
        pub name: String,
        pub username: String,
        pub email: String,
    }
}

pub fn list_posts(base: &str, user_id: Option<u32>) -> Route {
    let route = Route::get(base).path("posts");
    match user_id {
        Some(id) => route.query("userId", id),
        None => route,
    }
}

pub fn get_post(base: &str, id: u32) -> Route {
    Route::get(base).path("posts").segment(id)
}

pub fn create_post(base: &str, post: &models::NewPost) -> Route {
    Route::post(base).path("posts").json(post)
}

pub fn delete_post(base: &str, id: u32) -> Route {
    Route::delete(base).path("posts").segment(id)
}

pub fn get_user(base: &str, id: u32) -> Route {
    Route::get(base).path("users").segment(id)
}
