use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Record Store 中的一筆原始資料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "deserialize_integral_vec")]
    pub counts: Vec<i64>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_timestamp",
        serialize_with = "serialize_optional_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// 聚合後的結果：保留 key 與 createdAt，counts 加總為 totalCount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRecord {
    pub key: String,
    #[serde(
        deserialize_with = "deserialize_timestamp",
        serialize_with = "serialize_timestamp"
    )]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_integral")]
    pub total_count: i64,
}

/// 已驗證的查詢條件，只能透過 `core::validator::validate` 建立
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeQuery {
    start_date: NaiveDate,
    end_date: NaiveDate,
    min_count: i64,
    max_count: i64,
}

impl RangeQuery {
    pub(crate) fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        min_count: i64,
        max_count: i64,
    ) -> Self {
        debug_assert!(start_date <= end_date);
        debug_assert!(0 <= min_count && min_count <= max_count);
        Self {
            start_date,
            end_date,
            min_count,
            max_count,
        }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn min_count(&self) -> i64 {
        self.min_count
    }

    pub fn max_count(&self) -> i64 {
        self.max_count
    }
}

/// 日期以 UTC 午夜作為時間點
pub fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// createdAt 可能是 RFC 3339 字串，或 Extended JSON 的 {"$date": ...}
#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Text(String),
    Extended {
        #[serde(rename = "$date")]
        date: ExtendedDate,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExtendedDate {
    Text(String),
    Millis(i64),
    NumberLong {
        #[serde(rename = "$numberLong")]
        number_long: String,
    },
}

impl TimestampRepr {
    fn into_datetime<E: serde::de::Error>(self) -> Result<DateTime<Utc>, E> {
        match self {
            TimestampRepr::Text(text) | TimestampRepr::Extended {
                date: ExtendedDate::Text(text),
            } => parse_rfc3339(&text).map_err(E::custom),
            TimestampRepr::Extended {
                date: ExtendedDate::Millis(ms),
            } => from_millis(ms).map_err(E::custom),
            TimestampRepr::Extended {
                date: ExtendedDate::NumberLong { number_long },
            } => {
                let ms: i64 = number_long.parse().map_err(E::custom)?;
                from_millis(ms).map_err(E::custom)
            }
        }
    }
}

fn parse_rfc3339(text: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{}': {}", text, e))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| format!("timestamp out of range: {}", ms))
}

// Mongoose 以 double 儲存 Number，$sum 的結果可能是 2500.0
#[derive(Deserialize)]
#[serde(untagged)]
enum IntegralRepr {
    Int(i64),
    Float(f64),
    NumberLong {
        #[serde(rename = "$numberLong")]
        number_long: String,
    },
    NumberInt {
        #[serde(rename = "$numberInt")]
        number_int: String,
    },
    NumberDouble {
        #[serde(rename = "$numberDouble")]
        number_double: String,
    },
}

impl IntegralRepr {
    fn into_i64<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            IntegralRepr::Int(i) => Ok(i),
            IntegralRepr::Float(f) => integral_from_f64(f).map_err(E::custom),
            IntegralRepr::NumberLong { number_long: text }
            | IntegralRepr::NumberInt { number_int: text } => text.parse().map_err(E::custom),
            IntegralRepr::NumberDouble { number_double } => {
                let f: f64 = number_double.parse().map_err(E::custom)?;
                integral_from_f64(f).map_err(E::custom)
            }
        }
    }
}

/// 只接受沒有小數部分、且在 i64 範圍內的浮點數
pub fn integral_from_f64(value: f64) -> Result<i64, String> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(format!("expected an integral number, got {}", value));
    }
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return Err(format!("integral number out of range: {}", value));
    }
    Ok(value as i64)
}

fn deserialize_integral<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    IntegralRepr::deserialize(deserializer)?.into_i64()
}

fn deserialize_integral_vec<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<IntegralRepr>::deserialize(deserializer)?
        .into_iter()
        .map(IntegralRepr::into_i64::<D::Error>)
        .collect()
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    TimestampRepr::deserialize(deserializer)?.into_datetime()
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<TimestampRepr>::deserialize(deserializer)? {
        Some(repr) => repr.into_datetime().map(Some),
        None => Ok(None),
    }
}

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(ts))
}

fn serialize_optional_timestamp<S>(
    ts: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match ts {
        Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
        None => serializer.serialize_none(),
    }
}
