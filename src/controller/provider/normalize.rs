use serde_json::Value;
use tracing::debug;

use super::FixtureTeamStats;

// The provider's statistics labels are not contractually stable; these
// synonym tables are the only place label variants are known. An
// unrecognized label contributes nothing and is logged at debug so a
// renamed field shows up in logs instead of as a silent zero.
const CORNER_LABELS: &[&str] = &["Corner Kicks", "Corners", "Corner"];
const YELLOW_LABELS: &[&str] = &["Yellow Cards", "Yellow"];
const RED_LABELS: &[&str] = &["Red Cards", "Red"];
const XG_LABELS: &[&str] = &["expected_goals", "Expected Goals", "xG"];

/// Parses a statistic value that may arrive as a number, a numeric string,
/// or a percentage string like "57%".
fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<i64>().ok(),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
}

fn find_stat<'a>(pairs: &'a [Value], labels: &[&str]) -> Option<&'a Value> {
    pairs.iter().find_map(|pair| {
        let label = pair.get("type").and_then(Value::as_str)?;
        if labels.contains(&label) {
            pair.get("value")
        } else {
            None
        }
    })
}

fn stat_int(pairs: &[Value], labels: &[&str]) -> i64 {
    match find_stat(pairs, labels) {
        Some(value) => value_as_i64(value).unwrap_or(0),
        None => {
            debug!(canonical = labels[0], "statistic label not present in response");
            0
        }
    }
}

fn stat_float(pairs: &[Value], labels: &[&str]) -> Option<f64> {
    find_stat(pairs, labels).and_then(value_as_f64)
}

/// Collapses a loosely-typed `{type, value}` list into canonical fields.
#[must_use]
pub fn statistics_from_pairs(pairs: &[Value]) -> FixtureTeamStats {
    FixtureTeamStats {
        corners: stat_int(pairs, CORNER_LABELS),
        yellow_cards: stat_int(pairs, YELLOW_LABELS),
        red_cards: stat_int(pairs, RED_LABELS),
        expected_goals: stat_float(pairs, XG_LABELS),
    }
}

/// The player endpoint misspells "appearances" as "appearences"; accept
/// either spelling, misspelled one first since that is what ships today.
#[must_use]
pub fn games_appearances(games: &Value) -> i64 {
    games
        .get("appearences")
        .or_else(|| games.get("appearances"))
        .and_then(value_as_i64)
        .unwrap_or(0)
}

/// Tolerant integer read of a nested field, treating null/missing as zero.
#[must_use]
pub fn int_at(value: &Value, path: &[&str]) -> i64 {
    opt_int_at(value, path).unwrap_or(0)
}

#[must_use]
pub fn opt_int_at(value: &Value, path: &[&str]) -> Option<i64> {
    let mut cur = value;
    for key in path {
        cur = cur.get(key)?;
    }
    value_as_i64(cur)
}

#[must_use]
pub fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = value;
    for key in path {
        cur = cur.get(key)?;
    }
    cur.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_label_variants() {
        let pairs = vec![
            json!({"type": "Corner Kicks", "value": 7}),
            json!({"type": "Yellow", "value": "3"}),
            json!({"type": "Red Cards", "value": null}),
            json!({"type": "expected_goals", "value": "1.42"}),
        ];
        let stats = statistics_from_pairs(&pairs);
        assert_eq!(stats.corners, 7);
        assert_eq!(stats.yellow_cards, 3);
        assert_eq!(stats.red_cards, 0);
        assert_eq!(stats.expected_goals, Some(1.42));
    }

    #[test]
    fn unknown_labels_contribute_nothing() {
        let pairs = vec![json!({"type": "Corner Kickz", "value": 7})];
        let stats = statistics_from_pairs(&pairs);
        assert_eq!(stats.corners, 0);
        assert_eq!(stats.expected_goals, None);
    }

    #[test]
    fn percent_strings_parse() {
        let pairs = vec![json!({"type": "Corners", "value": "57%"})];
        assert_eq!(statistics_from_pairs(&pairs).corners, 57);
    }

    #[test]
    fn misspelled_appearances_wins() {
        let games = json!({"appearences": 12, "appearances": 99});
        assert_eq!(games_appearances(&games), 12);
        let games = json!({"appearances": 4});
        assert_eq!(games_appearances(&games), 4);
    }
}
