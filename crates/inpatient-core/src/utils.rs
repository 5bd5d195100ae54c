//! 通用工具函数

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// 住院天数，首尾两天均计入
///
/// 没有入院日期时返回 0；结束日期为出院日期，未出院时为 `today`。
/// 结束日期早于入院日期时按 1 天计。
pub fn admit_days(hosp_date: Option<NaiveDate>, discharge_date: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match hosp_date {
        None => 0,
        Some(start) => {
            let end = discharge_date.unwrap_or(today);
            ((end - start).num_days() + 1).max(1)
        }
    }
}

/// 日租金 × 天数
pub fn rent_amount(days: i64, daily_rate: Decimal) -> Decimal {
    daily_rate * Decimal::from(days)
}

/// 生成带前缀的序列号，如 `IP00042`
pub fn format_sequence_code(prefix: &str, number: u64, padding: usize) -> String {
    format!("{}{:0width$}", prefix, number, width = padding)
}

/// 大小写不敏感的包含匹配
pub fn ilike(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
