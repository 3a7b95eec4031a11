use crate::database::UserRecord;
use crate::migrations::BackfillOptions;
use serde_json::json;

/// Seed used wherever a test needs reproducible colours
pub const TEST_SEED: u64 = 0x5eed;

/// A user with no colour attribute
pub fn user(id: &str, username: &str) -> UserRecord {
    UserRecord::new(id)
        .with("username", username)
        .with("first_name", username.to_uppercase())
        .with("roles", json!({ "archived": false, "member": true }))
}

/// A user that already carries `color_id`
pub fn colored_user(id: &str, username: &str, color_id: u32) -> UserRecord {
    let mut record = user(id, username);
    record.set_color_id(color_id);
    record
}

pub fn seeded_options() -> BackfillOptions {
    BackfillOptions {
        seed: Some(TEST_SEED),
        ..BackfillOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_differ_only_in_colour() {
        let plain = user("u1", "ankush");
        let colored = colored_user("u1", "ankush", 2);

        assert!(!plain.has_colors());
        assert_eq!(colored.color_id(), Some(2));
        assert_eq!(plain.attributes, colored.attributes);
    }
}
