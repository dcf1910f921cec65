//! Authorized-user management (owner only).

use warden_core::UserId;

use super::Reply;
use crate::bootstrap::AppContext;

pub fn add(ctx: &AppContext, user: UserId) -> Reply {
    if user == ctx.access.owner() {
        return Reply::text("That is the owner, who always has access");
    }
    if ctx.access.add_user(user) {
        Reply::Text(format!("User {user} added"))
    } else {
        Reply::Text(format!("User {user} is already authorized"))
    }
}

pub fn remove(ctx: &AppContext, user: UserId) -> Reply {
    if ctx.access.remove_user(user) {
        Reply::Text(format!("User {user} removed"))
    } else {
        Reply::Text(format!("User {user} was not authorized"))
    }
}

pub fn list(ctx: &AppContext) -> Reply {
    let users = ctx.access.users();
    let mut text = format!("Owner: {}", ctx.access.owner());
    if users.is_empty() {
        text.push_str("\nNo other users");
    } else {
        for user in users {
            text.push_str(&format!("\nUser: {user}"));
        }
    }
    Reply::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::test_support::{RecordingSender, context_with, empty_table};

    #[test]
    fn test_add_remove_list() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_with(
            empty_table(),
            Arc::new(RecordingSender::default()),
            dir.path(),
            UserId(1),
            vec![UserId(2)],
        );

        assert_eq!(add(&ctx, UserId(3)), Reply::text("User 3 added"));
        assert_eq!(add(&ctx, UserId(3)), Reply::text("User 3 is already authorized"));
        assert_eq!(
            add(&ctx, UserId(1)),
            Reply::text("That is the owner, who always has access")
        );
        assert_eq!(
            list(&ctx),
            Reply::text("Owner: 1\nUser: 2\nUser: 3")
        );
        assert_eq!(remove(&ctx, UserId(2)), Reply::text("User 2 removed"));
        assert_eq!(remove(&ctx, UserId(2)), Reply::text("User 2 was not authorized"));
        assert!(!ctx.access.is_authorized(UserId(2)));
    }
}
