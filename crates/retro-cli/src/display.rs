use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};

use retro_core::error::RetroError;
use retro_core::models::item::ItemKind;

/// Text shown when a command fails. Mistakes the collector can fix get
/// their message alone; storage and setup faults keep the cause chain.
pub fn error_report(err: &anyhow::Error) -> String {
    match err.downcast_ref::<RetroError>() {
        Some(e) if e.is_domain() => e.to_string(),
        _ => format!("{err:?}"),
    }
}

/// French label for an item kind.
pub fn item_type_label(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Book => "Livre",
        ItemKind::Vinyl => "Vinyle",
        ItemKind::Film => "Film",
    }
}

/// Format an amount in euros the French way: `1 234,50 €`.
pub fn format_price(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('\u{202f}');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped},{:02}\u{a0}€", cents % 100)
}

/// Cut `text` to `max` characters, appending `...` when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    format!("{}...", head.trim_end())
}

pub fn format_tags(tags: &[String]) -> String {
    tags.join(", ")
}

const MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Long French date, e.g. `15 février 2025`.
pub fn format_date(dt: &DateTime<Utc>) -> String {
    use chrono::Datelike;
    let month = MONTHS[dt.month0() as usize];
    format!("{} {} {}", dt.day(), month, dt.year())
}

/// Relative age in French, e.g. `il y a 3 jours`.
pub fn time_ago(dt: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - *dt).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;
    let years = months / 12;

    if years > 0 {
        plural(years, "il y a 1 an", "ans")
    } else if months > 0 {
        plural(months, "il y a 1 mois", "mois")
    } else if days > 0 {
        plural(days, "hier", "jours")
    } else if hours > 0 {
        plural(hours, "il y a 1 heure", "heures")
    } else if minutes > 0 {
        plural(minutes, "il y a 1 minute", "minutes")
    } else if seconds <= 10 {
        "à l'instant".to_string()
    } else {
        format!("il y a {seconds} secondes")
    }
}

fn plural(n: i64, one: &str, unit: &str) -> String {
    if n == 1 {
        one.to_string()
    } else {
        format!("il y a {n} {unit}")
    }
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "oui"
    } else {
        "non"
    }
}

/// Await `fut` behind a spinner carrying `message`.
pub async fn spin<F: Future>(message: &str, fut: F) -> F::Output {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    pb.finish_and_clear();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_error_report() {
        let err = anyhow::Error::from(RetroError::InvalidCredentials);
        assert_eq!(error_report(&err), RetroError::InvalidCredentials.to_string());

        let err = anyhow::Error::from(RetroError::Database("disk I/O error".into()))
            .context("Ouverture du catalogue");
        let report = error_report(&err);
        assert!(report.starts_with("Ouverture du catalogue"));
        assert!(report.contains("disk I/O error"));
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(15.99), "15,99\u{a0}€");
        assert_eq!(format_price(0.0), "0,00\u{a0}€");
        assert_eq!(format_price(1234.5), "1\u{202f}234,50\u{a0}€");
        assert_eq!(format_price(1_000_000.0), "1\u{202f}000\u{202f}000,00\u{a0}€");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Fondation", 20), "Fondation");
        assert_eq!(truncate("Le Seigneur des Anneaux", 11), "Le Seigneur...");
        assert_eq!(truncate("Électricité", 3), "Éle...");
    }

    #[test]
    fn test_labels_and_tags() {
        assert_eq!(item_type_label(ItemKind::Vinyl), "Vinyle");
        assert_eq!(
            format_tags(&["classique".to_string(), "série".to_string()]),
            "classique, série"
        );
        assert_eq!(format_tags(&[]), "");
    }

    #[test]
    fn test_format_date() {
        let dt = Utc.with_ymd_and_hms(2025, 2, 15, 10, 30, 0).unwrap();
        assert_eq!(format_date(&dt), "15 février 2025");
    }

    #[test]
    fn test_time_ago() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(time_ago(&now, now), "à l'instant");
        assert_eq!(time_ago(&(now - chrono::Duration::days(1)), now), "hier");
        assert_eq!(
            time_ago(&(now - chrono::Duration::days(3)), now),
            "il y a 3 jours"
        );
        assert_eq!(
            time_ago(&(now - chrono::Duration::days(400)), now),
            "il y a 1 an"
        );
    }
}
