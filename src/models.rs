// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LedgerError;

/// Tags owned by the application itself; they exist on every device and never travel.
pub const SYSTEM_TAG_IDS: [i64; 11] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 22];

pub fn is_system_tag(id: i64) -> bool {
    SYSTEM_TAG_IDS.contains(&id)
}

/// 8 random bytes identifying a transaction, a transaction line or a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinaryId(pub [u8; 8]);

impl BinaryId {
    pub fn random() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Display for BinaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for BinaryId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s.trim()).map_err(|_| LedgerError::InvalidId(s.to_string()))?;
        let bytes: [u8; 8] = raw
            .try_into()
            .map_err(|_| LedgerError::InvalidId(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for BinaryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BinaryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for BinaryId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(&self.0[..]))
    }
}

impl FromSql for BinaryId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let blob = value.as_blob()?;
        let bytes: [u8; 8] = blob.try_into().map_err(|_| FromSqlError::InvalidBlobSize {
            expected_size: 8,
            blob_size: blob.len(),
        })?;
        Ok(Self(bytes))
    }
}

/// Every entity type that can be exported, imported and tombstoned.
///
/// The declaration order is the import order: each kind only references kinds
/// declared before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Icon,
    Currency,
    Tag,
    Wallet,
    Account,
    Counterparty,
    Transaction,
    Budget,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Icon,
        EntityKind::Currency,
        EntityKind::Tag,
        EntityKind::Wallet,
        EntityKind::Account,
        EntityKind::Counterparty,
        EntityKind::Transaction,
        EntityKind::Budget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Icon => "icon",
            EntityKind::Currency => "currency",
            EntityKind::Tag => "tag",
            EntityKind::Wallet => "wallet",
            EntityKind::Account => "account",
            EntityKind::Counterparty => "counterparty",
            EntityKind::Transaction => "transaction",
            EntityKind::Budget => "budget",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Whether rows of this kind are keyed by a [`BinaryId`] rather than a small integer.
    pub fn has_binary_id(&self) -> bool {
        matches!(self, EntityKind::Transaction | EntityKind::Budget)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary key of any synced row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Small(i64),
    Binary(BinaryId),
}

impl EntityId {
    /// Parses the textual id used in tombstones for the given kind.
    pub fn parse(kind: EntityKind, s: &str) -> Result<Self, LedgerError> {
        if kind.has_binary_id() {
            Ok(EntityId::Binary(s.parse()?))
        } else {
            s.trim()
                .parse::<i64>()
                .map(EntityId::Small)
                .map_err(|_| LedgerError::invalid(format!("invalid {} id '{}'", kind, s)))
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Small(id) => write!(f, "{}", id),
            EntityId::Binary(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Small(id)
    }
}

impl From<BinaryId> for EntityId {
    fn from(id: BinaryId) -> Self {
        EntityId::Binary(id)
    }
}

impl ToSql for EntityId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            EntityId::Small(id) => id.to_sql(),
            EntityId::Binary(id) => id.to_sql(),
        }
    }
}

/// Entity tag carried by a tombstone. Tags this build does not know are kept
/// verbatim so they can be skipped rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeletedEntity {
    Known(EntityKind),
    Unknown(String),
}

impl From<String> for DeletedEntity {
    fn from(s: String) -> Self {
        match EntityKind::from_wire(&s) {
            Some(kind) => DeletedEntity::Known(kind),
            None => DeletedEntity::Unknown(s),
        }
    }
}

impl From<DeletedEntity> for String {
    fn from(e: DeletedEntity) -> Self {
        match e {
            DeletedEntity::Known(kind) => kind.as_str().to_string(),
            DeletedEntity::Unknown(s) => s,
        }
    }
}

/// Direction of a transaction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

impl Sign {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sign::Plus => "+",
            Sign::Minus => "-",
        }
    }

    pub fn apply(&self, amount: i64) -> i64 {
        match self {
            Sign::Plus => amount,
            Sign::Minus => -amount,
        }
    }
}

impl ToSql for Sign {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Sign {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "+" => Ok(Sign::Plus),
            "-" => Ok(Sign::Minus),
            other => Err(FromSqlError::Other(
                format!("invalid line sign '{}'", other).into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub id: i64,
    pub value: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub decimal_places: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub updated_at: i64,
    #[serde(default)]
    pub parents: Vec<i64>,
    #[serde(default)]
    pub children: Vec<i64>,
    pub icon: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub name: String,
    pub color: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub tags: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub wallet: i64,
    pub currency: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub tags: Vec<i64>,
    /// Derived from the account's lines; never carried in a package.
    #[serde(skip)]
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: i64,
    pub name: String,
    pub note: Option<String>,
    pub updated_at: i64,
    #[serde(default)]
    pub tags: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub id: BinaryId,
    pub account: i64,
    pub tag: i64,
    pub sign: Sign,
    pub amount: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
}

impl TransactionLine {
    pub fn signed_amount(&self) -> i64 {
        self.sign.apply(self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: BinaryId,
    pub timestamp: i64,
    pub updated_at: i64,
    pub counterparty: Option<i64>,
    pub note: Option<String>,
    pub lines: Vec<TransactionLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BinaryId,
    pub start: i64,
    pub end: i64,
    pub tag: i64,
    pub amount: i64,
    pub updated_at: i64,
}

impl Budget {
    /// Budgets cover the half-open window `[start, end)`.
    pub fn covers(&self, ts: i64) -> bool {
        self.start <= ts && ts < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub entity: DeletedEntity,
    pub entity_id: String,
    pub deleted_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub last_push_at: i64,
    pub last_sync_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_id_hex_is_uppercase_and_parses_either_case() {
        let id = BinaryId([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02, 0x0a]);
        assert_eq!(id.to_hex(), "DEADBEEF0001020A");
        assert_eq!("deadbeef0001020a".parse::<BinaryId>().unwrap(), id);
        assert!("DEADBEEF".parse::<BinaryId>().is_err());
        assert!("not hex at all!!".parse::<BinaryId>().is_err());
    }

    #[test]
    fn entity_id_parses_by_kind() {
        assert_eq!(
            EntityId::parse(EntityKind::Wallet, "42").unwrap(),
            EntityId::Small(42)
        );
        let id = EntityId::parse(EntityKind::Transaction, "00000000000000FF").unwrap();
        assert_eq!(id.to_string(), "00000000000000FF");
        assert!(EntityId::parse(EntityKind::Budget, "42").is_err());
        assert!(EntityId::parse(EntityKind::Account, "abc").is_err());
    }

    #[test]
    fn deleted_entity_keeps_unknown_tags() {
        let known: DeletedEntity = "account".to_string().into();
        assert_eq!(known, DeletedEntity::Known(EntityKind::Account));
        let unknown: DeletedEntity = "spaceship".to_string().into();
        assert_eq!(unknown, DeletedEntity::Unknown("spaceship".into()));
        assert_eq!(String::from(unknown), "spaceship");
    }

    #[test]
    fn sign_round_trips_through_json() {
        let s: Sign = serde_json::from_str("\"-\"").unwrap();
        assert_eq!(s, Sign::Minus);
        assert_eq!(s.apply(250), -250);
        assert_eq!(serde_json::to_string(&Sign::Plus).unwrap(), "\"+\"");
    }

    #[test]
    fn budget_window_is_half_open() {
        let b = Budget {
            id: BinaryId([1; 8]),
            start: 100,
            end: 200,
            tag: 11,
            amount: 5000,
            updated_at: 0,
        };
        assert!(b.covers(100));
        assert!(b.covers(199));
        assert!(!b.covers(200));
    }
}
