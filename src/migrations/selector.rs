use serde_json::Value;

use crate::database::UserRecord;

/// A user needs a colour iff the attribute is absent altogether. An explicit
/// `null` reads as absent.
///
/// Presence is never judged by truthiness: `{}`, `0` or `false` all count as
/// a colour the user already has, which keeps reruns from touching them.
pub fn needs_color(user: &UserRecord) -> bool {
    matches!(user.colors, None | Some(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{colored_user, user};
    use serde_json::json;

    #[test]
    fn selects_only_users_without_colors() {
        assert!(needs_color(&user("u1", "ankush")));
        assert!(!needs_color(&colored_user("u2", "nikhil", 3)));
    }

    #[test]
    fn null_colors_count_as_absent() {
        let mut record = user("u1", "ankush");
        record.colors = Some(Value::Null);
        assert!(needs_color(&record));
        assert!(needs_color(&user("u2", "nikhil").with("colors", Value::Null)));
    }

    #[test]
    fn zero_valued_colors_are_not_reselected() {
        let zero = colored_user("u1", "ankush", 0);
        let empty = user("u2", "nikhil").with("colors", json!({}));
        let falsy = user("u3", "sumit").with("colors", json!(false));

        assert!(!needs_color(&zero));
        assert!(!needs_color(&empty));
        assert!(!needs_color(&falsy));
    }
}
