#![allow(dead_code)]

use rusqlite::types::Value;
use rusqlite::{params, Row};
use tablekit_core::{
    open_db_in_memory, DbConfig, Expr, Fetch, QuerySpec, Record, Session, Table, TableService,
};

pub const SCHEMA: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    age INTEGER NOT NULL,
    team TEXT
);
CREATE TABLE settings (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub team: Option<String>,
}

impl User {
    pub fn new(id: i64, name: &str, age: i64, team: Option<&str>) -> Self {
        Self {
            id,
            name: name.to_string(),
            age,
            team: team.map(str::to_string),
        }
    }
}

impl Table for User {
    const NAME: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["id", "name", "age", "team"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            age: row.get("age")?,
            team: row.get("team")?,
        })
    }

    fn insert_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::Integer(self.id)),
            ("name", Value::Text(self.name.clone())),
            ("age", Value::Integer(self.age)),
            ("team", self.team.clone().map_or(Value::Null, Value::Text)),
        ]
    }

    fn primary_key_value(&self) -> Value {
        Value::Integer(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

impl Table for Setting {
    const NAME: &'static str = "settings";
    const COLUMNS: &'static [&'static str] = &["key", "value"];
    const PRIMARY_KEY: &'static str = "key";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get("key")?,
            value: row.get("value")?,
        })
    }

    fn insert_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("key", Value::Text(self.key.clone())),
            ("value", Value::Text(self.value.clone())),
        ]
    }

    fn primary_key_value(&self) -> Value {
        Value::Text(self.key.clone())
    }
}

pub fn open_session() -> Session {
    let conn = open_db_in_memory(&DbConfig::default()).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    Session::new(conn)
}

pub fn seed_users(session: &Session, users: &[User]) {
    for user in users {
        session
            .connection()
            .execute(
                "INSERT INTO users (id, name, age, team) VALUES (?1, ?2, ?3, ?4);",
                params![user.id, user.name, user.age, user.team],
            )
            .unwrap();
    }
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

/// First user matching `row_filter`, decoded as a model.
pub fn first_user(service: &TableService<'_, User>, row_filter: Expr) -> Option<User> {
    service
        .read(&QuerySpec::new().filter(row_filter), Fetch::First)
        .into_result()
        .unwrap()
        .into_first()
        .and_then(Record::into_model)
}

pub fn total_users(service: &TableService<'_, User>) -> u64 {
    service.count(None, &[]).into_result().unwrap()
}
