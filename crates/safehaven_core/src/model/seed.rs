//! Built-in example posts used to initialize an empty local store.

use crate::model::post::{Comment, Post};

/// Returns the two-post seed collection.
///
/// Timestamps are fixed strings so a freshly seeded store serializes to the
/// same bytes on every call.
pub fn seed_posts() -> Vec<Post> {
    vec![
        Post {
            id: "1".to_string(),
            author: "Sarah Jenkins".to_string(),
            content: "Recovery is not a straight line. Some days are harder than others, \
                      but finding a community that understands has been my saving grace. \
                      Remember, you are not alone in this journey."
                .to_string(),
            timestamp: "2024-01-15T08:00:00.000Z".to_string(),
            likes: 24,
            comments: vec![Comment {
                id: "c1".to_string(),
                author: "Mike T.".to_string(),
                content: "Thank you for sharing this. Needed to hear it today.".to_string(),
                timestamp: "2024-01-15T09:00:00.000Z".to_string(),
            }],
        },
        Post {
            id: "2".to_string(),
            author: "Anonymous".to_string(),
            content: "Today marks one year since I left my abusive situation. It was the \
                      hardest thing I ever did, but the freedom I feel now is worth every \
                      struggle. To anyone thinking about leaving: You can do it."
                .to_string(),
            timestamp: "2024-01-15T05:00:00.000Z".to_string(),
            likes: 156,
            comments: Vec::new(),
        },
    ]
}
