// ==========================================
// 商品目录导入系统 - 行字段读取
// ==========================================
// 职责: 从 RowData 读取并转换字段值，转换失败返回 RowError::Validation
// 约定: 空字符串视为未填写
// ==========================================

use crate::domain::import_job::RowData;
use crate::importer::error::RowError;

pub struct FieldReader<'a> {
    data: &'a RowData,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a RowData) -> Self {
        Self { data }
    }

    /// 可选文本字段（空值 → None）
    pub fn optional(&self, field: &str) -> Option<&'a str> {
        self.data.get(field).map(str::trim).filter(|v| !v.is_empty())
    }

    /// 必填文本字段
    pub fn required(&self, field: &str) -> Result<&'a str, RowError> {
        self.optional(field).ok_or_else(|| RowError::missing(field))
    }

    pub fn optional_string(&self, field: &str) -> Option<String> {
        self.optional(field).map(str::to_string)
    }

    /// 布尔字段（true/false/yes/no/1/0），未填写返回 default
    pub fn bool_or(&self, field: &str, default: bool) -> Result<bool, RowError> {
        match self.optional(field) {
            None => Ok(default),
            Some(raw) => match raw.to_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(true),
                "false" | "no" | "n" | "0" => Ok(false),
                _ => Err(RowError::validation(field, format!("无法识别的布尔值 '{}'", raw))),
            },
        }
    }

    /// 金额字段（元 → 分，四舍五入）
    pub fn cents(&self, field: &str) -> Result<Option<i64>, RowError> {
        match self.optional(field) {
            None => Ok(None),
            Some(raw) => parse_cents(raw)
                .map(Some)
                .ok_or_else(|| RowError::validation(field, format!("无效金额 '{}'", raw))),
        }
    }

    /// 正整数字段，未填写返回 default
    pub fn positive_int_or(&self, field: &str, default: i64) -> Result<i64, RowError> {
        match self.optional(field) {
            None => Ok(default),
            Some(raw) => match raw.parse::<i64>() {
                Ok(v) if v > 0 => Ok(v),
                _ => Err(RowError::validation(field, format!("期望正整数，实际 '{}'", raw))),
            },
        }
    }

    /// 分号分隔的列表字段（去重，保序）
    pub fn list(&self, field: &str) -> Vec<&'a str> {
        let mut items: Vec<&'a str> = Vec::new();
        if let Some(raw) = self.optional(field) {
            for item in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }
        items
    }
}

/// 解析非负金额为分
///
/// 直接按十进制文本计算（不经过 f64），第三位小数四舍五入（远离零）
fn parse_cents(raw: &str) -> Option<i64> {
    let text = raw.trim();
    let text = text.strip_prefix('$').unwrap_or(text);

    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let digit = |i: usize| fraction.as_bytes().get(i).map_or(0, |b| i64::from(b - b'0'));
    let round_up = i64::from(digit(2) >= 5);

    whole
        .checked_mul(100)?
        .checked_add(digit(0) * 10 + digit(1))?
        .checked_add(round_up)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> RowData {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_required_and_optional() {
        let row = data(&[("email", " a@example.com "), ("first_name", "")]);
        let reader = FieldReader::new(&row);

        assert_eq!(reader.required("email").unwrap(), "a@example.com");
        assert_eq!(reader.optional("first_name"), None);
        assert_eq!(reader.required("first_name"), Err(RowError::missing("first_name")));
        assert_eq!(reader.optional("absent"), None);
    }

    #[test]
    fn test_cents_parsing() {
        let row = data(&[("price", "19.99"), ("bad", "abc"), ("neg", "-1"), ("usd", "$5")]);
        let reader = FieldReader::new(&row);

        assert_eq!(reader.cents("price").unwrap(), Some(1999));
        assert_eq!(reader.cents("usd").unwrap(), Some(500));
        assert_eq!(reader.cents("missing").unwrap(), None);
        assert!(reader.cents("bad").is_err());
        assert!(reader.cents("neg").is_err());
    }

    #[test]
    fn test_cents_round_half_away_from_zero() {
        assert_eq!(parse_cents("1.005"), Some(101));
        assert_eq!(parse_cents("0.145"), Some(15));
        assert_eq!(parse_cents("2.675"), Some(268));
        assert_eq!(parse_cents("2.674"), Some(267));
        assert_eq!(parse_cents("0.5"), Some(50));
        assert_eq!(parse_cents(".99"), Some(99));
        assert_eq!(parse_cents("7."), Some(700));
        assert_eq!(parse_cents("1.999"), Some(200));
    }

    #[test]
    fn test_cents_rejects_malformed_text() {
        for raw in ["", ".", "1.2.3", "1e3", "+5", "12,50", "NaN", "inf", "-0.01"] {
            assert_eq!(parse_cents(raw), None, "{:?}", raw);
        }
        assert_eq!(parse_cents("92233720368547759.00"), None);
    }

    #[test]
    fn test_bool_int_and_list() {
        let row = data(&[
            ("accepts_marketing", "Yes"),
            ("quantity", "0"),
            ("variant_skus", "A; B;;A ;C"),
        ]);
        let reader = FieldReader::new(&row);

        assert!(reader.bool_or("accepts_marketing", false).unwrap());
        assert!(!reader.bool_or("missing", false).unwrap());
        assert!(reader.positive_int_or("quantity", 1).is_err());
        assert_eq!(reader.positive_int_or("missing", 1).unwrap(), 1);
        assert_eq!(reader.list("variant_skus"), vec!["A", "B", "C"]);
    }
}
