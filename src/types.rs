//! Enums and record helpers for values that cross the CLI boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CliError;

/// Daemon connection state, as reported by the `state` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    LoggedOut,
    LoggingIn,
    LoggedIn,
    AutoConnecting,
    Connecting,
    Disconnecting,
    Connected,
    Overlimit,
    Unknown,
}

impl FromStr for State {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOGGED_OUT" => Ok(State::LoggedOut),
            "LOGGING_IN" => Ok(State::LoggingIn),
            "LOGGED_IN" => Ok(State::LoggedIn),
            "AUTO_CONNECTING" => Ok(State::AutoConnecting),
            "CONNECTING" => Ok(State::Connecting),
            "DISCONNECTING" => Ok(State::Disconnecting),
            "CONNECTED" => Ok(State::Connected),
            "OVERLIMIT" => Ok(State::Overlimit),
            "UNKNOWN" => Ok(State::Unknown),
            other => Err(CliError::UnexpectedResponse(format!(
                "unknown state {other:?}"
            ))),
        }
    }
}

impl State {
    /// Pull the `state` field out of a CLI response object.
    pub(crate) fn from_response(response: &Value) -> Result<Self, CliError> {
        response
            .get("state")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CliError::UnexpectedResponse("response carries no state field".to_string())
            })?
            .parse()
    }
}

/// Per-adapter scheduling priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Automatic,
    Always,
    Backup,
    Secondary,
    Never,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Automatic => "automatic",
            Priority::Always => "always",
            Priority::Backup => "backup",
            Priority::Secondary => "secondary",
            Priority::Never => "never",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bonding operation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Redundant,
    Speed,
    Streaming,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Redundant => "redundant",
            Mode::Speed => "speed",
            Mode::Streaming => "streaming",
        }
    }
}

/// Tunnel transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    Auto,
    Udp,
    Tcp,
    MultiTcp,
    Https,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Auto => "auto",
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
            Transport::MultiTcp => "multi-tcp",
            Transport::Https => "https",
        }
    }
}

/// Add/remove/replace operation for the streaming-bypass list commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    Add,
    Rem,
    Set,
}

impl ListOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListOp::Add => "add",
            ListOp::Rem => "rem",
            ListOp::Set => "set",
        }
    }
}

/// Target selector for `connect` and `connectmethod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectMethod {
    Closest,
    Public,
    Private,
    P2p,
    Last,
    Country {
        country: String,
        city: Option<String>,
        num: Option<u32>,
    },
}

impl ConnectMethod {
    /// Country selector without a city or server number.
    pub fn country(code: impl Into<String>) -> Self {
        ConnectMethod::Country {
            country: code.into(),
            city: None,
            num: None,
        }
    }

    pub(crate) fn push_args(&self, args: &mut Vec<String>) {
        match self {
            ConnectMethod::Closest => args.push("closest".to_string()),
            ConnectMethod::Public => args.push("public".to_string()),
            ConnectMethod::Private => args.push("private".to_string()),
            ConnectMethod::P2p => args.push("p2p".to_string()),
            ConnectMethod::Last => args.push("last".to_string()),
            ConnectMethod::Country { country, city, num } => {
                args.push(country.clone());
                if let Some(city) = city {
                    args.push(city.clone());
                    if let Some(num) = num {
                        args.push(num.to_string());
                    }
                }
            }
        }
    }
}

/// Split a streamed record into its `[tag, payload]` halves.
///
/// Streamed records arrive as a 2-element array of type tag ("adapters",
/// "state", "session_stats", ...) and payload object. Returns `None` for
/// anything shaped differently; the reader itself never inspects tags.
pub fn record_parts(record: &Value) -> Option<(&str, &Value)> {
    match record.as_array()?.as_slice() {
        [Value::String(tag), payload] => Some((tag.as_str(), payload)),
        _ => None,
    }
}

/// Render `show connectmethod` JSON as a label, hyphenated (`us-nova-2`)
/// or space-separated for feeding back to the CLI.
pub fn connect_method_label(response: &Value, hyphenated: bool) -> String {
    let sep = if hyphenated { "-" } else { " " };
    let method = response
        .get("connectMethod")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if method != "country" {
        return method.to_string();
    }
    let mut label = response
        .get("country")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if let Some(city) = response
        .get("city")
        .and_then(Value::as_str)
        .filter(|city| !city.is_empty())
    {
        label.push_str(sep);
        label.push_str(city);
        if let Some(num) = response
            .get("num")
            .and_then(Value::as_u64)
            .filter(|num| *num != 0)
        {
            label.push_str(sep);
            label.push_str(&num.to_string());
        }
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_parses_case_insensitively_with_whitespace() {
        assert_eq!("CONNECTED".parse::<State>().unwrap(), State::Connected);
        assert_eq!("connected".parse::<State>().unwrap(), State::Connected);
        assert_eq!(" LOGGED_IN ".parse::<State>().unwrap(), State::LoggedIn);
    }

    #[test]
    fn unknown_state_string_is_rejected() {
        assert!(matches!(
            "WARP_SPEED".parse::<State>(),
            Err(CliError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn state_from_response_requires_state_field() {
        let response = json!({"state": "AUTO_CONNECTING"});
        assert_eq!(
            State::from_response(&response).unwrap(),
            State::AutoConnecting
        );
        assert!(State::from_response(&json!({"other": 1})).is_err());
    }

    #[test]
    fn priority_values_match_cli_vocabulary() {
        assert_eq!(Priority::Automatic.as_str(), "automatic");
        assert_eq!(Priority::Always.as_str(), "always");
        assert_eq!(Priority::Backup.as_str(), "backup");
        assert_eq!(Priority::Secondary.as_str(), "secondary");
        assert_eq!(Priority::Never.as_str(), "never");
    }

    #[test]
    fn connect_method_args_nest_city_and_num() {
        let mut args = Vec::new();
        ConnectMethod::Country {
            country: "us".to_string(),
            city: Some("nova".to_string()),
            num: Some(2),
        }
        .push_args(&mut args);
        assert_eq!(args, ["us", "nova", "2"]);

        // a server number without a city is meaningless and dropped
        let mut args = Vec::new();
        ConnectMethod::Country {
            country: "us".to_string(),
            city: None,
            num: Some(2),
        }
        .push_args(&mut args);
        assert_eq!(args, ["us"]);
    }

    #[test]
    fn record_parts_splits_tag_and_payload() {
        let record = json!(["session_stats", {"bytes": 42}]);
        let (tag, payload) = record_parts(&record).unwrap();
        assert_eq!(tag, "session_stats");
        assert_eq!(payload, &json!({"bytes": 42}));

        assert!(record_parts(&json!({"not": "an array"})).is_none());
        assert!(record_parts(&json!(["only_tag"])).is_none());
        assert!(record_parts(&json!([1, {"payload": true}])).is_none());
    }

    #[test]
    fn connect_method_label_renders_both_separators() {
        let response = json!({"connectMethod": "country", "country": "us", "city": "nova", "num": 2});
        assert_eq!(connect_method_label(&response, true), "us-nova-2");
        assert_eq!(connect_method_label(&response, false), "us nova 2");

        let closest = json!({"connectMethod": "closest", "country": "", "city": "", "num": 0});
        assert_eq!(connect_method_label(&closest, true), "closest");
    }
}
