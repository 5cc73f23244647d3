//! Team registrations and the approval transition.
//!
//! A submission lands in `registrations` with status `unapproved` and stays
//! immutable until an admin reviews the payment proof. Approval promotes the
//! row into `approved_members` and deletes the source inside one transaction,
//! so an id never exists in both tables and a crash mid-approval leaves the
//! registration pending rather than duplicated or lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use crate::error::AppError;

pub const DEFAULT_EVENT_CODE: &str = "codeathon-2.0";

const MISSING_FIELDS: AppError = AppError::InvalidRequest("Missing or invalid fields");

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    Circuit,
    NonCircuit,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Circuit => "circuit",
            Theme::NonCircuit => "non-circuit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Leader,
    Member,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub role: Role,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Raw submission body. Everything is optional/defaulted here so that field
/// presence can be checked in order instead of bubbling a serde error.
#[derive(Debug, Default, Deserialize)]
pub struct RegistrationPayload {
    #[serde(default)]
    pub team_name: String,
    pub theme: Option<Theme>,
    #[serde(default)]
    pub team_size: i32,
    pub members: Option<Vec<Member>>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub txn_id: String,
    #[serde(default)]
    pub payment_proof_url: Option<String>,
    #[serde(default)]
    pub event_code: Option<String>,
}

/// A payload that passed validation and is ready to insert.
#[derive(Debug)]
pub struct NewRegistration {
    pub team_name: String,
    pub theme: Theme,
    pub team_size: i32,
    pub members: Vec<Member>,
    pub amount: i64,
    pub txn_id: String,
    pub payment_proof_url: Option<String>,
    pub event_code: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub team_name: String,
    pub theme: String,
    pub team_size: i32,
    pub members: Json<Vec<Member>>,
    pub amount: i64,
    pub txn_id: String,
    pub payment_proof_url: Option<String>,
    pub event_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ApprovedMember {
    pub id: Uuid,
    pub team_name: String,
    pub theme: String,
    pub team_size: i32,
    pub members: Json<Vec<Member>>,
    pub amount: i64,
    pub txn_id: String,
    pub payment_proof_url: Option<String>,
    pub event_code: String,
    pub approved_at: DateTime<Utc>,
}

pub fn parse(body: Value) -> Result<NewRegistration, AppError> {
    let payload: RegistrationPayload =
        serde_json::from_value(body).map_err(|_| MISSING_FIELDS)?;

    validate(payload)
}

pub fn validate(payload: RegistrationPayload) -> Result<NewRegistration, AppError> {
    if payload.team_name.is_empty() {
        return Err(MISSING_FIELDS);
    }
    let Some(theme) = payload.theme else {
        return Err(MISSING_FIELDS);
    };
    if payload.team_size == 0 {
        return Err(MISSING_FIELDS);
    }
    let Some(members) = payload.members else {
        return Err(MISSING_FIELDS);
    };

    if members.len() != payload.team_size as usize {
        return Err(MISSING_FIELDS);
    }

    if !(2..=4).contains(&payload.team_size) {
        return Err(AppError::InvalidRequest("Team size must be between 2 and 4"));
    }

    Ok(NewRegistration {
        team_name: payload.team_name,
        theme,
        team_size: payload.team_size,
        members,
        amount: payload.amount,
        txn_id: payload.txn_id,
        payment_proof_url: payload.payment_proof_url,
        event_code: payload
            .event_code
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_CODE.to_string()),
    })
}

pub async fn insert(pool: &PgPool, reg: &NewRegistration) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO registrations \
         (team_name, theme, team_size, members, amount, txn_id, payment_proof_url, status, event_code) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'unapproved', $8)",
    )
    .bind(&reg.team_name)
    .bind(reg.theme.as_str())
    .bind(reg.team_size)
    .bind(Json(&reg.members))
    .bind(reg.amount)
    .bind(&reg.txn_id)
    .bind(&reg.payment_proof_url)
    .bind(&reg.event_code)
    .execute(pool)
    .await?;

    Ok(())
}

/// Oldest first, matching the review order admins work through.
pub async fn list_pending(pool: &PgPool) -> Result<Vec<Registration>, AppError> {
    let rows = sqlx::query_as(
        "SELECT id, team_name, theme, team_size, members, amount, txn_id, \
                payment_proof_url, event_code, created_at \
         FROM registrations WHERE status = 'unapproved' ORDER BY created_at ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn list_approved(pool: &PgPool) -> Result<Vec<ApprovedMember>, AppError> {
    let rows = sqlx::query_as(
        "SELECT id, team_name, theme, team_size, members, amount, txn_id, \
                payment_proof_url, event_code, approved_at \
         FROM approved_members ORDER BY approved_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Promotes one registration into `approved_members` and removes the source
/// row, all inside a single transaction. Returns false when the id no longer
/// resolves (stale admin UI), which callers treat as a silent no-op.
pub async fn approve(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let row: Option<Registration> = sqlx::query_as(
        "SELECT id, team_name, theme, team_size, members, amount, txn_id, \
                payment_proof_url, event_code, created_at \
         FROM registrations WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        return Ok(false);
    };

    sqlx::query(
        "INSERT INTO approved_members \
         (team_name, theme, team_size, members, amount, txn_id, payment_proof_url, event_code, approved_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())",
    )
    .bind(&row.team_name)
    .bind(&row.theme)
    .bind(row.team_size)
    .bind(&row.members)
    .bind(row.amount)
    .bind(&row.txn_id)
    .bind(&row.payment_proof_url)
    .bind(&row.event_code)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM registrations WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn members(n: usize) -> Vec<Member> {
        (0..n)
            .map(|i| Member {
                role: if i == 0 { Role::Leader } else { Role::Member },
                name: format!("person {i}"),
                email: format!("p{i}@example.com"),
                phone: "9999999999".to_string(),
            })
            .collect()
    }

    fn valid_payload() -> RegistrationPayload {
        RegistrationPayload {
            team_name: "bitflippers".to_string(),
            theme: Some(Theme::Circuit),
            team_size: 3,
            members: Some(members(3)),
            amount: 180,
            txn_id: "TXN123".to_string(),
            payment_proof_url: Some("https://cdn/proof.png".to_string()),
            event_code: None,
        }
    }

    #[test]
    fn test_valid_payload_passes() {
        let reg = validate(valid_payload()).unwrap();

        assert_eq!(reg.team_size, 3);
        assert_eq!(reg.members.len(), 3);
        assert_eq!(reg.event_code, DEFAULT_EVENT_CODE);
    }

    #[test]
    fn test_explicit_event_code_kept() {
        let mut payload = valid_payload();
        payload.event_code = Some("codeathon-3.0".to_string());

        assert_eq!(validate(payload).unwrap().event_code, "codeathon-3.0");
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut no_name = valid_payload();
        no_name.team_name = String::new();
        assert!(validate(no_name).is_err());

        let mut no_theme = valid_payload();
        no_theme.theme = None;
        assert!(validate(no_theme).is_err());

        let mut no_members = valid_payload();
        no_members.members = None;
        assert!(validate(no_members).is_err());
    }

    #[test]
    fn test_member_count_must_match_size() {
        let mut payload = valid_payload();
        payload.members = Some(members(2));

        assert!(validate(payload).is_err());
    }

    #[test]
    fn test_team_size_range_enforced() {
        for size in [1, 5] {
            let mut payload = valid_payload();
            payload.team_size = size;
            payload.members = Some(members(size as usize));

            assert!(validate(payload).is_err(), "size {size} should be rejected");
        }
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(parse(json!({"team_name": "x"})).is_err());
        assert!(parse(json!([1, 2, 3])).is_err());
        assert!(
            parse(json!({
                "team_name": "x",
                "theme": "underwater",
                "team_size": 2,
                "members": []
            }))
            .is_err()
        );
    }

    #[test]
    fn test_parse_accepts_wire_shape() {
        let reg = parse(json!({
            "team_name": "bitflippers",
            "theme": "non-circuit",
            "team_size": 2,
            "members": [
                {"role": "leader", "name": "a", "email": "a@x.com", "phone": "1"},
                {"role": "member", "name": "b", "email": "b@x.com", "phone": "2"}
            ],
            "amount": 120,
            "txn_id": "TXN9"
        }))
        .unwrap();

        assert_eq!(reg.theme, Theme::NonCircuit);
        assert_eq!(reg.members[0].role, Role::Leader);
    }

    mod db {
        use sqlx::PgPool;

        use super::*;
        use crate::error::SCHEMA_HINT;

        async fn init_schema(pool: &PgPool) {
            sqlx::raw_sql(include_str!("../scripts/01_create_tables.sql"))
                .execute(pool)
                .await
                .unwrap();
        }

        async fn insert_team(pool: &PgPool, name: &str) {
            let mut payload = valid_payload();
            payload.team_name = name.to_string();

            insert(pool, &validate(payload).unwrap()).await.unwrap();
        }

        #[sqlx::test(migrations = false)]
        async fn test_approve_moves_row_into_approved(pool: PgPool) {
            init_schema(&pool).await;
            insert_team(&pool, "bitflippers").await;

            let pending = list_pending(&pool).await.unwrap();
            assert_eq!(pending.len(), 1);
            let id = pending[0].id;

            assert!(approve(&pool, id).await.unwrap());

            // Moved, not flagged: the id no longer resolves on the pending side.
            assert!(list_pending(&pool).await.unwrap().is_empty());

            let approved = list_approved(&pool).await.unwrap();
            assert_eq!(approved.len(), 1);
            assert_eq!(approved[0].team_name, "bitflippers");
            assert_eq!(approved[0].theme, "circuit");
            assert_eq!(approved[0].team_size, 3);
            assert_eq!(approved[0].members.0.len(), 3);
            assert!(approved[0].approved_at >= pending[0].created_at);
        }

        #[sqlx::test(migrations = false)]
        async fn test_approve_unknown_id_is_noop(pool: PgPool) {
            init_schema(&pool).await;
            insert_team(&pool, "bitflippers").await;

            assert!(!approve(&pool, Uuid::new_v4()).await.unwrap());

            assert_eq!(list_pending(&pool).await.unwrap().len(), 1);
            assert!(list_approved(&pool).await.unwrap().is_empty());
        }

        #[sqlx::test(migrations = false)]
        async fn test_approve_twice_promotes_once(pool: PgPool) {
            init_schema(&pool).await;
            insert_team(&pool, "bitflippers").await;

            let id = list_pending(&pool).await.unwrap()[0].id;

            assert!(approve(&pool, id).await.unwrap());
            assert!(!approve(&pool, id).await.unwrap());

            assert_eq!(list_approved(&pool).await.unwrap().len(), 1);
        }

        #[sqlx::test(migrations = false)]
        async fn test_pending_listed_oldest_first(pool: PgPool) {
            init_schema(&pool).await;
            for name in ["first", "second", "third"] {
                insert_team(&pool, name).await;
            }

            let pending = list_pending(&pool).await.unwrap();
            let names: Vec<&str> = pending.iter().map(|r| r.team_name.as_str()).collect();

            assert_eq!(names, ["first", "second", "third"]);
        }

        #[sqlx::test(migrations = false)]
        async fn test_insert_defaults(pool: PgPool) {
            init_schema(&pool).await;
            insert_team(&pool, "bitflippers").await;

            let pending = list_pending(&pool).await.unwrap();
            assert_eq!(pending[0].event_code, DEFAULT_EVENT_CODE);
            assert_eq!(pending[0].txn_id, "TXN123");
            assert_eq!(pending[0].members.0[0].role, Role::Leader);
        }

        #[sqlx::test(migrations = false)]
        async fn test_missing_schema_maps_to_hint(pool: PgPool) {
            // No init_schema: a fresh backend before the init script has run.
            let err = list_pending(&pool).await.unwrap_err();

            match err {
                AppError::Database(msg) => assert_eq!(msg, SCHEMA_HINT),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
