//! Mock server responses

use serde_json::{Value, json};

/// Token used against mock servers
pub const TEST_TOKEN: &str = "test-token";

/// Counter used against mock servers
pub const TEST_COUNTER: &str = "4242";

/// Path prefix of every call for [`TEST_COUNTER`]
pub const COUNTER_PATH: &str = "/management/v1/counter/4242";

/// Part with two visits, the second without goals
pub const VISITS_PART: &str = "ym:s:date\tym:s:visitID\tym:s:goalsID\tym:s:goalsDateTime\n\
2024-01-01\t101\t[7,8]\t['2024-01-01 10:00:00','2024-01-01 10:05:00']\n\
2024-01-01\t102\t[]\t[]\n";

/// Part with one visit whose goal timestamp carries escaped quotes
pub const ESCAPED_PART: &str = "ym:s:date\tym:s:visitID\tym:s:goalsID\tym:s:goalsDateTime\n\
2024-01-02\t201\t[9]\t[\\'2024-01-02 11:00:00\\']\n";

/// Body of an evaluate response
pub fn evaluation(possible: bool, max_days: u32) -> Value {
    json!({
        "log_request_evaluation": {
            "possible": possible,
            "max_possible_day_quantity": max_days
        }
    })
}

/// Body of a create/status/clean response
pub fn log_request(request_id: i64, status: &str, parts: u32) -> Value {
    let parts: Vec<Value> = (0..parts)
        .map(|n| json!({ "part_number": n, "size": 1024 }))
        .collect();
    json!({
        "log_request": {
            "request_id": request_id,
            "counter_id": 4242,
            "source": "visits",
            "status": status,
            "parts": parts
        }
    })
}

/// Body of a list response
pub fn request_list(entries: &[(i64, &str)]) -> Value {
    let requests: Vec<Value> = entries
        .iter()
        .map(|(id, status)| log_request(*id, status, 0)["log_request"].clone())
        .collect();
    json!({ "requests": requests })
}
