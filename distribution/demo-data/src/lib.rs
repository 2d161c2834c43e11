//! Sample notifications used to seed preview and screenshot databases.

use once_cell::sync::Lazy;

/// One sample notification. `minutes_ago` is relative to the time of seeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoNotification {
    pub package_name: String,
    pub app_name: String,
    pub title: String,
    pub text: String,
    pub minutes_ago: i64,
}

const NOTIFICATIONS_CSV: &str = include_str!("../notifications.csv");

/// Sample set, newest first
pub static DEMO_NOTIFICATIONS: Lazy<Vec<DemoNotification>> = Lazy::new(|| {
    parse_notifications(NOTIFICATIONS_CSV).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to parse demo notifications CSV: {}", e);
        Vec::new()
    })
});

fn parse_notifications(data: &str) -> Result<Vec<DemoNotification>, Box<dyn std::error::Error>> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let mut notifications = Vec::new();

    for result in reader.records() {
        let record = result?;
        let field = |idx: usize| -> Result<String, Box<dyn std::error::Error>> {
            Ok(record.get(idx).ok_or("Missing column")?.to_string())
        };
        notifications.push(DemoNotification {
            package_name: field(0)?,
            app_name: field(1)?,
            title: field(2)?,
            text: field(3)?,
            minutes_ago: field(4)?.trim().parse()?,
        });
    }

    Ok(notifications)
}

/// Distinct package names in the sample set, in first-seen order
pub fn demo_packages() -> Vec<&'static str> {
    let mut packages: Vec<&'static str> = Vec::new();
    for notification in DEMO_NOTIFICATIONS.iter() {
        if !packages.contains(&notification.package_name.as_str()) {
            packages.push(&notification.package_name);
        }
    }
    packages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_csv_parses() {
        assert_eq!(DEMO_NOTIFICATIONS.len(), 9);
        let first = &DEMO_NOTIFICATIONS[0];
        assert_eq!(first.package_name, "com.whatsapp");
        assert_eq!(first.title, "John Doe");
        assert_eq!(first.minutes_ago, 1);
    }

    #[test]
    fn test_quoted_fields() {
        let youtube = DEMO_NOTIFICATIONS
            .iter()
            .find(|n| n.app_name == "YouTube")
            .unwrap();
        assert!(youtube.text.starts_with("\"10 Android Development Tips"));
    }

    #[test]
    fn test_sorted_newest_first() {
        assert!(DEMO_NOTIFICATIONS
            .windows(2)
            .all(|w| w[0].minutes_ago <= w[1].minutes_ago));
        assert_eq!(demo_packages().len(), 5);
    }
}
