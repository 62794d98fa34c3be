use std::{collections::HashMap, fmt, sync::Arc};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::{errors::Error, options::Config};

/// One fetched row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Receives the column's fetched values (one per selected field) and the whole row.
pub type ValueFn = Arc<dyn Fn(&[Value], &Row) -> Value + Send + Sync>;

/// A transformation applied to a fetched value before it is displayed or exported.
#[derive(Clone)]
pub enum Callback {
    Format(Formatter),
    /// Looked up in a [`CallbackRegistry`] when invoked.
    Named(String),
    Custom(ValueFn),
}

impl Callback {
    pub fn custom(f: impl Fn(&[Value], &Row) -> Value + Send + Sync + 'static) -> Self {
        Callback::Custom(Arc::new(f))
    }

    pub fn invoke(
        &self,
        args: &[Value],
        row: &Row,
        registry: &CallbackRegistry,
        config: &Config,
    ) -> Result<Value, Error> {
        match self {
            Callback::Format(formatter) => {
                let value = args.first().unwrap_or(&Value::Null);
                Ok(formatter.apply(value, config))
            }
            Callback::Named(name) => {
                let f = registry
                    .get(name)
                    .ok_or_else(|| Error::UnknownCallback(name.clone()))?;
                Ok(f(args, row))
            }
            Callback::Custom(f) => Ok(f(args, row)),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Format(formatter) => f.debug_tuple("Format").field(formatter).finish(),
            Callback::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Callback::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, ValueFn>,
}

impl CallbackRegistry {
    pub fn register(
        &mut self,
        name: &str,
        f: impl Fn(&[Value], &Row) -> Value + Send + Sync + 'static,
    ) -> &mut Self {
        self.callbacks.insert(name.to_string(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ValueFn> {
        self.callbacks.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formatter {
    Boolean,
    YesNo,
    /// A chrono format string, or the configured default.
    Date(Option<String>),
    Time(Option<String>),
    Datetime(Option<String>),
    /// Thousands separators with a fixed number of decimals.
    Number { places: u32 },
    Round { places: u32 },
    JsonList,
    Truncate(usize),
}

impl Formatter {
    pub fn apply(&self, value: &Value, config: &Config) -> Value {
        match self {
            Formatter::Boolean => Value::Bool(is_truthy(value)),
            Formatter::YesNo => {
                Value::String(if is_truthy(value) { "Yes" } else { "No" }.to_string())
            }
            Formatter::Date(format) => {
                let format = format.as_deref().unwrap_or(&config.default_date_format);
                reformat(value, |s| parse_datetime(s).map(|dt| dt.format(format).to_string()))
            }
            Formatter::Datetime(format) => {
                let format = format.as_deref().unwrap_or(&config.default_datetime_format);
                reformat(value, |s| parse_datetime(s).map(|dt| dt.format(format).to_string()))
            }
            Formatter::Time(format) => {
                let format = format.as_deref().unwrap_or(&config.default_time_format);
                reformat(value, |s| parse_time(s).map(|t| t.format(format).to_string()))
            }
            Formatter::Number { places } => match as_number(value) {
                Some(n) => Value::String(number_format(n, *places)),
                None => value.clone(),
            },
            Formatter::Round { places } => match as_number(value) {
                Some(n) => round_value(n, *places),
                None => value.clone(),
            },
            Formatter::JsonList => match value {
                Value::String(s) => match serde_json::from_str::<Value>(s) {
                    Ok(Value::Array(items)) => Value::String(join_list(&items)),
                    _ => value.clone(),
                },
                Value::Array(items) => Value::String(join_list(items)),
                _ => value.clone(),
            },
            Formatter::Truncate(length) => match value {
                Value::String(s) if s.chars().count() > *length => {
                    let head: String = s.chars().take(*length).collect();
                    Value::String(format!("{head}..."))
                }
                _ => value.clone(),
            },
        }
    }
}

fn reformat(value: &Value, f: impl Fn(&str) -> Option<String>) -> Value {
    match value {
        Value::String(s) if !s.is_empty() => f(s).map(Value::String).unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}

fn join_list(items: &[Value]) -> String {
    items.iter().map(display_text).collect::<Vec<_>>().join(", ")
}

/// Empty strings, `"0"`, zero, `false` and null are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// The plain text form of a value, with strings unquoted and null as empty.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.time()))
}

pub fn number_format(n: f64, places: u32) -> String {
    let fixed = format!("{:.*}", places as usize, n.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (fixed, None),
    };
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if n < 0.0 && fixed_is_nonzero(&grouped, &fraction) { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

fn fixed_is_nonzero(whole: &str, fraction: &Option<String>) -> bool {
    let digits = whole.chars().chain(fraction.iter().flat_map(|f| f.chars()));
    digits.filter(|c| c.is_ascii_digit()).any(|c| c != '0')
}

fn round_value(n: f64, places: u32) -> Value {
    let factor = 10f64.powi(places as i32);
    let rounded = (n * factor).round() / factor;
    if places == 0 {
        Value::from(rounded as i64)
    } else {
        Value::from(rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_finite_strings_are_numbers() {
        assert_eq!(as_number(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(as_number(&json!(true)), Some(1.0));
        assert_eq!(as_number(&json!("NaN")), None);
        assert_eq!(as_number(&json!("inf")), None);
        assert_eq!(as_number(&json!("-Infinity")), None);
    }

    #[test]
    fn number_format_groups_thousands() {
        assert_eq!(number_format(1234567.891, 2), "1,234,567.89");
        assert_eq!(number_format(-1000.0, 0), "-1,000");
        assert_eq!(number_format(999.0, 1), "999.0");
        assert_eq!(number_format(-0.001, 2), "0.00");
    }

    #[test]
    fn dates_reformat_and_leave_garbage_alone() {
        let config = Config::default();
        let date = Formatter::Date(Some("%d/%m/%Y".to_string()));
        assert_eq!(date.apply(&json!("2021-03-04"), &config), json!("04/03/2021"));
        assert_eq!(
            date.apply(&json!("2021-03-04 10:30:00"), &config),
            json!("04/03/2021")
        );
        assert_eq!(date.apply(&json!("soon"), &config), json!("soon"));
        assert_eq!(date.apply(&Value::Null, &config), Value::Null);
    }

    #[test]
    fn times_use_configured_default() {
        let config = Config::default();
        let time = Formatter::Time(None);
        assert_eq!(time.apply(&json!("14:05:00"), &config), json!("02:05 PM"));
    }

    #[test]
    fn truthiness_follows_form_conventions() {
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!("0")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!("no")));
        assert!(is_truthy(&json!(2)));
    }

    #[test]
    fn rounding_and_lists() {
        let config = Config::default();
        assert_eq!(Formatter::Round { places: 1 }.apply(&json!(2.46), &config), json!(2.5));
        assert_eq!(Formatter::Round { places: 0 }.apply(&json!("7.6"), &config), json!(8));
        assert_eq!(
            Formatter::JsonList.apply(&json!(r#"["a", "b", 3]"#), &config),
            json!("a, b, 3")
        );
    }

    #[test]
    fn named_callbacks_resolve_through_registry() {
        let mut registry = CallbackRegistry::default();
        registry.register("shout", |args, _| {
            Value::String(display_text(&args[0]).to_uppercase())
        });
        let config = Config::default();
        let row = Row::new();
        let shout = Callback::Named("shout".to_string());
        assert_eq!(
            shout.invoke(&[json!("hi")], &row, &registry, &config).unwrap(),
            json!("HI")
        );
        let missing = Callback::Named("whisper".to_string());
        assert!(matches!(
            missing.invoke(&[], &row, &registry, &config),
            Err(Error::UnknownCallback(_))
        ));
    }
}
