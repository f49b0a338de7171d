//! Persisted key layout. These strings are a compatibility surface; existing
//! data written by earlier deployments uses exactly these shapes.

pub fn profile(user_id: &str) -> String {
    format!("user:{user_id}:profile")
}

pub fn roadmap(user_id: &str) -> String {
    format!("user:{user_id}:roadmap")
}

pub fn offer(user_id: &str) -> String {
    format!("user:{user_id}:offer")
}

pub fn habits(user_id: &str) -> String {
    format!("user:{user_id}:habits")
}

pub fn habit_log(user_id: &str, habit_id: &str) -> String {
    format!("user:{user_id}:habit_logs:{habit_id}")
}

pub fn pushmode(user_id: &str) -> String {
    format!("user:{user_id}:pushmode")
}

pub fn mindset(user_id: &str) -> String {
    format!("user:{user_id}:mindset")
}

pub fn intake_state(user_id: &str) -> String {
    format!("user:{user_id}:intake_state")
}

pub fn offer_state(user_id: &str) -> String {
    format!("user:{user_id}:offer_state")
}

pub fn history(user_id: &str) -> String {
    format!("user:{user_id}:history")
}

pub fn sales_reviews(user_id: &str) -> String {
    format!("user:{user_id}:sales_reviews")
}

/// Arbitrary per-user entry, used by the admin memory commands.
pub fn user_entry(user_id: &str, name: &str) -> String {
    format!("user:{user_id}:{name}")
}

/// Escape glob metacharacters so `text` only matches itself.
pub fn glob_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '*' | '?' | '[' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            c => out.push(c),
        }
    }
    out
}

/// Glob matching every key owned by a user. The id is matched literally.
pub fn user_prefix_pattern(user_id: &str) -> String {
    format!("user:{}:*", glob_escape(user_id))
}

pub fn config(name: &str) -> String {
    format!("config:{name}")
}

pub fn admin_log(timestamp_millis: i64, log_id: &str) -> String {
    format!("admin:logs:{timestamp_millis}:{log_id}")
}

pub const ADMIN_LOG_PATTERN: &str = "admin:logs:*";

/// Extract the user id from a `user:{id}:...` key.
pub fn user_id_of(key: &str) -> Option<&str> {
    let rest = key.strip_prefix("user:")?;
    let (id, _) = rest.split_once(':')?;
    if id.is_empty() { None } else { Some(id) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_legacy_shapes() {
        assert_eq!(profile("42"), "user:42:profile");
        assert_eq!(intake_state("42"), "user:42:intake_state");
        assert_eq!(offer_state("42"), "user:42:offer_state");
        assert_eq!(habit_log("42", "h1"), "user:42:habit_logs:h1");
        assert_eq!(config("global_tone"), "config:global_tone");
        assert_eq!(admin_log(1700000000000, "abc"), "admin:logs:1700000000000:abc");
    }

    #[test]
    fn user_id_of_parses_owner() {
        assert_eq!(user_id_of("user:U1:roadmap"), Some("U1"));
        assert_eq!(user_id_of("user:U1:habit_logs:h"), Some("U1"));
        assert_eq!(user_id_of("config:x"), None);
        assert_eq!(user_id_of("user::profile"), None);
    }

    #[test]
    fn user_prefix_pattern_escapes_glob_characters() {
        assert_eq!(user_prefix_pattern("U1"), "user:U1:*");
        assert_eq!(user_prefix_pattern("*"), "user:[*]:*");
        assert_eq!(user_prefix_pattern("a?[b]"), "user:a[?][[]b]:*");
    }
}
