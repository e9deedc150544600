use chrono::Utc;

/// Returns the current time as epoch milliseconds.
///
/// Lock timestamps on the coordination record are stored in this unit.
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_millis_is_recent() {
        let now = epoch_millis();
        // anything after 2020-01-01 counts as a sane clock
        assert!(now > 1_577_836_800_000);
    }
}
