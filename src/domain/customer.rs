use std::{fmt, str::FromStr};

use async_trait::async_trait;
use derive_more::{Deref, Display, From};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::DataAccessError;

/// ストレージ識別子の項目名
pub const STORAGE_ID_FIELD: &str = "_id";

/// 顧客リポジトリ
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// 全顧客を取得する
    async fn all(&self) -> Result<Vec<Customer>, DataAccessError>;
    /// `id` が一致する最初の顧客を取得する
    async fn find_one(&self, id: CustomerId) -> Result<Option<Customer>, DataAccessError>;
    /// 顧客を登録し、ストレージが採番した識別子を返す
    async fn insert(&self, customer: Customer) -> Result<StorageId, DataAccessError>;
    /// `id` が一致する最初の顧客に項目をマージし、一致件数を返す
    async fn update_one(&self, id: CustomerId, fields: Customer) -> Result<u64, DataAccessError>;
    /// `id` が一致する最初の顧客を削除し、削除件数を返す
    async fn delete_one(&self, id: CustomerId) -> Result<u64, DataAccessError>;
    /// 全顧客を削除する
    async fn delete_all(&self) -> Result<(), DataAccessError>;
    /// 顧客をまとめて登録する
    async fn insert_many(&self, customers: Vec<Customer>) -> Result<(), DataAccessError>;
    /// 接続を解放する
    async fn close(&self) -> Result<(), DataAccessError>;
}

/// 顧客リポジトリの接続
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn CustomerRepository>, DataAccessError>;
}

/// 顧客番号
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Deref, Default,
)]
pub struct CustomerId(i64);

impl CustomerId {
    /// パスやクエリの文字列を顧客番号に変換する
    ///
    /// 前後の空白は無視し、空文字列は `0` とする。`0x`・`0b`・`0o` で始まる
    /// 符号なし整数も受け付ける。整数として読めない文字列は `None`。
    pub fn coerce(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Some(Self(0));
        }
        let (radix, digits) = match trimmed.get(..2) {
            Some("0x" | "0X") => (16, &trimmed[2..]),
            Some("0o" | "0O") => (8, &trimmed[2..]),
            Some("0b" | "0B") => (2, &trimmed[2..]),
            _ => return trimmed.parse::<f64>().ok().and_then(Self::from_number),
        };
        // from_str_radix は先頭の `+` も読むため桁だけを許す
        if !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        i64::from_str_radix(digits, radix).ok().map(Self)
    }

    /// 整数値の数値だけを顧客番号とする
    pub fn from_number(number: f64) -> Option<Self> {
        if !number.is_finite() || number.fract() != 0.0 {
            return None;
        }
        if number < i64::MIN as f64 || number > i64::MAX as f64 {
            return None;
        }
        Some(Self(number as i64))
    }
}

/// ストレージ識別子
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Deref,
)]
pub struct StorageId(Uuid);

impl StorageId {
    /// 新しい識別子を採番する
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// 顧客ドキュメント
///
/// 送信された項目をそのまま保持する。ストレージ識別子は含まない。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Customer(Map<String, Value>);

impl Customer {
    pub fn new(id: i64, name: &str, email: &str, password: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_owned(), Value::from(id));
        fields.insert("name".to_owned(), Value::from(name));
        fields.insert("email".to_owned(), Value::from(email));
        fields.insert("password".to_owned(), Value::from(password));
        Self(fields)
    }

    /// 送信された項目から顧客を作成する。ストレージ識別子は取り除く
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        fields.remove(STORAGE_ID_FIELD);
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set_id(&mut self, id: Option<CustomerId>) {
        let value = id.map_or(Value::Null, |id| Value::from(*id));
        self.0.insert("id".to_owned(), value);
    }

    /// 整数値の `id`
    pub fn id(&self) -> Option<CustomerId> {
        self.0
            .get("id")
            .and_then(Value::as_f64)
            .and_then(CustomerId::from_number)
    }

    /// `id` を数値として比較する。数値以外の `id` は一致しない
    pub fn has_id(&self, id: CustomerId) -> bool {
        self.0.get("id").and_then(Value::as_f64) == Some(*id as f64)
    }

    /// 検索可能な項目の完全一致
    pub fn matches(&self, field: LookupField, value: &str) -> bool {
        match field {
            LookupField::Id => CustomerId::coerce(value).map_or(false, |id| self.has_id(id)),
            LookupField::Email | LookupField::Password => {
                self.0.get(field.name()).and_then(Value::as_str) == Some(value)
            }
        }
    }

    /// 送信された項目だけを上書きする
    pub fn merge(&mut self, fields: Customer) {
        self.0.extend(fields.0);
    }

    /// ストレージ識別子付きの保存形式
    pub fn with_storage_id(&self, storage_id: StorageId) -> Map<String, Value> {
        let mut document = self.0.clone();
        document.insert(STORAGE_ID_FIELD.to_owned(), Value::from(storage_id.to_string()));
        document
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Customer {
    fn from(value: Map<String, Value>) -> Self {
        Self::from_fields(value)
    }
}

/// 検索可能な項目
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LookupField {
    Id,
    Email,
    Password,
}

impl LookupField {
    pub const ALL: [LookupField; 3] = [LookupField::Id, LookupField::Email, LookupField::Password];

    pub fn name(&self) -> &'static str {
        match self {
            LookupField::Id => "id",
            LookupField::Email => "email",
            LookupField::Password => "password",
        }
    }
}

impl fmt::Display for LookupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LookupField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| UnknownField(s.to_owned()))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown lookup field: {0}")]
pub struct UnknownField(pub String);

/// 初期データ
pub static SEED_CUSTOMERS: Lazy<Vec<Customer>> = Lazy::new(|| {
    vec![
        Customer::new(0, "Mary Jackson", "maryj@abc.com", "maryj"),
        Customer::new(1, "Karen Addams", "karena@abc.com", "karena"),
        Customer::new(2, "Scott Ramsey", "scottr@abc.com", "scottr"),
    ]
});

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn customer(value: Value) -> Customer {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_coerce() {
        assert_eq!(CustomerId::coerce("2"), Some(CustomerId(2)));
        assert_eq!(CustomerId::coerce(" 2 "), Some(CustomerId(2)));
        assert_eq!(CustomerId::coerce("2.0"), Some(CustomerId(2)));
        assert_eq!(CustomerId::coerce("-7"), Some(CustomerId(-7)));
        assert_eq!(CustomerId::coerce(""), Some(CustomerId(0)));
        assert_eq!(CustomerId::coerce("2.5"), None);
        assert_eq!(CustomerId::coerce("abc"), None);
        assert_eq!(CustomerId::coerce("NaN"), None);
        assert_eq!(CustomerId::coerce("inf"), None);
    }

    #[test]
    fn test_coerce_prefixed_integers() {
        assert_eq!(CustomerId::coerce("0x10"), Some(CustomerId(16)));
        assert_eq!(CustomerId::coerce("0X1f"), Some(CustomerId(31)));
        assert_eq!(CustomerId::coerce("0b11"), Some(CustomerId(3)));
        assert_eq!(CustomerId::coerce(" 0o7 "), Some(CustomerId(7)));
        assert_eq!(CustomerId::coerce("0x"), None);
        assert_eq!(CustomerId::coerce("0x+1"), None);
        assert_eq!(CustomerId::coerce("-0x1"), None);
        assert_eq!(CustomerId::coerce("0b12"), None);
        assert_eq!(CustomerId::coerce("0x1.5"), None);
    }

    #[test]
    fn test_lookup_field_parse() {
        assert_eq!("id".parse::<LookupField>(), Ok(LookupField::Id));
        assert_eq!("email".parse::<LookupField>(), Ok(LookupField::Email));
        assert_eq!(
            "password".parse::<LookupField>(),
            Ok(LookupField::Password)
        );
        assert_eq!(
            "Email".parse::<LookupField>(),
            Err(UnknownField("Email".to_owned()))
        );
        assert!("name".parse::<LookupField>().is_err());
    }

    #[test]
    fn test_matches() {
        let entity = customer(json!({"id": 2, "email": "scottr@abc.com", "password": "scottr"}));
        assert!(entity.matches(LookupField::Id, "2"));
        assert!(entity.matches(LookupField::Id, "2.0"));
        assert!(!entity.matches(LookupField::Id, "3"));
        assert!(entity.matches(LookupField::Email, "scottr@abc.com"));
        assert!(!entity.matches(LookupField::Email, "SCOTTR@abc.com"));
        assert!(!entity.matches(LookupField::Email, "scottr"));
        assert!(entity.matches(LookupField::Password, "scottr"));
    }

    #[test]
    fn test_string_id_is_not_a_number() {
        let entity = customer(json!({"id": "2"}));
        assert!(!entity.has_id(CustomerId(2)));
        assert!(!entity.matches(LookupField::Id, "2"));
    }

    #[test]
    fn test_merge_keeps_unsubmitted_fields() {
        let mut entity = customer(json!({"id": 1, "name": "A", "email": "a@x"}));
        entity.merge(customer(json!({"id": 1, "email": "b@x"})));
        assert_eq!(entity, customer(json!({"id": 1, "name": "A", "email": "b@x"})));
    }

    #[test]
    fn test_from_fields_drops_storage_id() {
        let fields = json!({"_id": "abc", "name": "A"}).as_object().cloned().unwrap();
        let entity = Customer::from_fields(fields);
        assert_eq!(entity.get(STORAGE_ID_FIELD), None);
        assert_eq!(entity.get("name"), Some(&json!("A")));
    }

    #[test]
    fn test_set_id() {
        let mut entity = customer(json!({"id": 9, "name": "A"}));
        entity.set_id(CustomerId::coerce("4"));
        assert_eq!(entity.get("id"), Some(&json!(4)));
        entity.set_id(None);
        assert_eq!(entity.get("id"), Some(&Value::Null));
    }

    #[test]
    fn test_seed_customers() {
        let ids = SEED_CUSTOMERS
            .iter()
            .map(|c| c.get("id").and_then(Value::as_i64))
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(
            SEED_CUSTOMERS[1],
            customer(json!({
                "id": 1,
                "name": "Karen Addams",
                "email": "karena@abc.com",
                "password": "karena",
            }))
        );
    }
}
