// src/controllers/mod.rs

pub mod auth;
pub mod connection;
pub mod feed;
pub mod interaction;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, mpsc};

    use tokio::sync::Notify;

    use crate::{
        models::{comment::Comment, like::Like, post::Post, user::User},
        state::Session,
    };

    pub fn session(user_id: i64) -> Session {
        Session {
            token: "token".to_string(),
            current_user: User::reference(user_id, format!("user{}", user_id)),
        }
    }

    pub fn post(id: i64, author: i64, like_count: u32) -> Post {
        Post {
            id,
            author: User::reference(author, format!("user{}", author)),
            content: Some(format!("post {}", id)),
            image: None,
            video_url: None,
            created_at: None,
            like_count,
            comment_count: 0,
        }
    }

    pub fn comment(id: i64, author: i64, post_id: i64, text: &str) -> Comment {
        Comment {
            id,
            post: Some(post_id),
            author: User::reference(author, format!("user{}", author)),
            text: text.to_string(),
            created_at: None,
        }
    }

    pub fn like(id: i64, user: i64, post_id: i64) -> Like {
        Like {
            id,
            user,
            post: Some(post_id),
            created_at: None,
        }
    }

    /// Test side of a [`gate`]: waits for the held call and lets it finish.
    pub struct Gate {
        entered: Arc<Notify>,
        release: mpsc::Sender<()>,
    }

    /// Mock side of a [`gate`], moved into a `returning` closure.
    pub struct Latch {
        entered: Arc<Notify>,
        release: mpsc::Receiver<()>,
    }

    /// Holds a mocked API call open until the test releases it.
    ///
    /// `Latch::wait` blocks the runtime thread polling the call, so tests
    /// need the multi-threaded runtime and must run the call in a spawned task.
    pub fn gate() -> (Gate, Latch) {
        let entered = Arc::new(Notify::new());
        let (tx, rx) = mpsc::channel();
        (
            Gate {
                entered: entered.clone(),
                release: tx,
            },
            Latch {
                entered,
                release: rx,
            },
        )
    }

    impl Gate {
        /// Resolves once the mocked call has started.
        pub async fn entered(&self) {
            self.entered.notified().await;
        }

        pub fn release(&self) {
            let _ = self.release.send(());
        }
    }

    impl Latch {
        pub fn wait(&self) {
            self.entered.notify_one();
            let _ = self.release.recv();
        }
    }
}
