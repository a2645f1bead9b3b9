use super::ConsultationStore;
use crate::error::{EntityKind, StoreError, StoreResult};
use crate::filter::{ConsultationPredicate, Include};
use crate::models::{
    Consultation, ConsultationChanges, ConsultationDetails, ConsultationDraft,
    ConsultationStatus, Doctor, DoctorWithUser, NewDoctor, NewPerson, NewUser, Person, User,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use consult_types::NonEmptyText;
use consult_uuid::RecordId;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

const MIGRATIONS: [(i64, &str); 1] = [(1, include_str!("migrations/001_initial.sql"))];

const CONSULTATION_SELECT: &str = "
    SELECT c.id, c.person_id, c.doctor_id, c.date_time_utc, c.status, c.reason, c.notes,
           p.id, p.first_name, p.last_name, p.birth_date, p.phone,
           d.id, d.user_id, d.specialty,
           u.id, u.email, u.first_name, u.last_name
    FROM consultations c
    LEFT JOIN persons p ON p.id = c.person_id
    LEFT JOIN doctors d ON d.id = c.doctor_id
    LEFT JOIN users u ON u.id = d.user_id";

const DOCTOR_SELECT: &str = "
    SELECT d.id, d.user_id, d.specialty, u.id, u.email, u.first_name, u.last_name
    FROM doctors d
    JOIN users u ON u.id = d.user_id
    WHERE d.id = ?1";

/// SQLite-backed store.
///
/// Owns a single connection for the lifetime of the process. Open it once at startup with
/// [`SqliteStore::open`], share it behind an `Arc`, and call [`SqliteStore::close`] at shutdown
/// so that close errors are reported instead of swallowed by `Drop`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and brings its schema up to date.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        tracing::info!("opened consultation database at {}", path.display());
        Self::prepare(conn)
    }

    /// Opens a private in-memory database with the full schema.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> StoreResult<Self> {
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Closes the underlying connection.
    pub fn close(self) -> StoreResult<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| StoreError::LockPoisoned)?;
        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        tracing::info!("closed consultation database");
        Ok(())
    }

    /// Highest applied migration version.
    pub fn schema_version(&self) -> StoreResult<i64> {
        self.with_conn(|conn| Ok(current_version(conn)))
    }

    /// Runs `f` on the calling task. Every statement is a short local-file query and the only
    /// caller is the one-shot CLI, so nothing is moved to `spawn_blocking`; a long-running
    /// server would need that.
    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut conn)
    }
}

fn configure_pragmas(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(())
}

fn run_migrations(conn: &Connection) -> StoreResult<()> {
    let current = current_version(conn);

    for (version, sql) in MIGRATIONS {
        if version > current {
            tracing::info!("running consultation schema migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// 0 when the schema has never been created.
fn current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

// ============================================================================
// ENCODING
// ============================================================================

fn encode_instant(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_instant(value: String) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| StoreError::CorruptRow {
            column: "date_time_utc",
            value,
        })
}

fn decode_id(column: &'static str, value: String) -> StoreResult<RecordId> {
    RecordId::parse(&value).map_err(|_| StoreError::CorruptRow { column, value })
}

fn decode_text(column: &'static str, value: String) -> StoreResult<NonEmptyText> {
    NonEmptyText::new(&value).map_err(|_| StoreError::CorruptRow { column, value })
}

fn decode_date(column: &'static str, value: Option<String>) -> StoreResult<Option<NaiveDate>> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                .map_err(|_| StoreError::CorruptRow { column, value: v })
        })
        .transpose()
}

fn decode_status(value: String) -> StoreResult<ConsultationStatus> {
    value.parse().map_err(|_| StoreError::CorruptRow {
        column: "status",
        value,
    })
}

// ============================================================================
// ROW MAPPING
// ============================================================================

/// Column values of one joined consultation row, before validation.
struct RawConsultationRow {
    id: String,
    person_id: String,
    doctor_id: String,
    date_time_utc: String,
    status: String,
    reason: Option<String>,
    notes: Option<String>,
    person: Option<RawPersonRow>,
    doctor: Option<RawDoctorRow>,
}

struct RawPersonRow {
    id: String,
    first_name: String,
    last_name: String,
    birth_date: Option<String>,
    phone: Option<String>,
}

struct RawDoctorRow {
    id: String,
    user_id: String,
    specialty: Option<String>,
    user: Option<RawUserRow>,
}

struct RawUserRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
}

impl RawConsultationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let person = match row.get::<_, Option<String>>(7)? {
            Some(id) => Some(RawPersonRow {
                id,
                first_name: row.get(8)?,
                last_name: row.get(9)?,
                birth_date: row.get(10)?,
                phone: row.get(11)?,
            }),
            None => None,
        };

        let doctor = match row.get::<_, Option<String>>(12)? {
            Some(id) => Some(RawDoctorRow {
                id,
                user_id: row.get(13)?,
                specialty: row.get(14)?,
                user: RawUserRow::from_row_at(row, 15)?,
            }),
            None => None,
        };

        Ok(Self {
            id: row.get(0)?,
            person_id: row.get(1)?,
            doctor_id: row.get(2)?,
            date_time_utc: row.get(3)?,
            status: row.get(4)?,
            reason: row.get(5)?,
            notes: row.get(6)?,
            person,
            doctor,
        })
    }

    fn into_details(self, include: Include) -> StoreResult<ConsultationDetails> {
        let consultation = Consultation {
            id: decode_id("consultations.id", self.id)?,
            person_id: decode_id("consultations.person_id", self.person_id)?,
            doctor_id: decode_id("consultations.doctor_id", self.doctor_id)?,
            date_time_utc: decode_instant(self.date_time_utc)?,
            status: decode_status(self.status)?,
            reason: self.reason,
            notes: self.notes,
        };

        let person = match self.person {
            Some(raw) if include.person() => Some(raw.into_person()?),
            _ => None,
        };
        let doctor = self.doctor.map(RawDoctorRow::into_doctor).transpose()?.flatten();

        Ok(ConsultationDetails {
            consultation,
            person,
            doctor,
        })
    }
}

impl RawPersonRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            birth_date: row.get(3)?,
            phone: row.get(4)?,
        })
    }

    fn into_person(self) -> StoreResult<Person> {
        Ok(Person {
            id: decode_id("persons.id", self.id)?,
            first_name: decode_text("persons.first_name", self.first_name)?,
            last_name: decode_text("persons.last_name", self.last_name)?,
            birth_date: decode_date("persons.birth_date", self.birth_date)?,
            phone: self.phone,
        })
    }
}

impl RawDoctorRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            specialty: row.get(2)?,
            user: RawUserRow::from_row_at(row, 3)?,
        })
    }

    /// `None` when the user row is missing from a left join.
    fn into_doctor(self) -> StoreResult<Option<DoctorWithUser>> {
        let Some(user) = self.user else {
            return Ok(None);
        };

        Ok(Some(DoctorWithUser {
            doctor: Doctor {
                id: decode_id("doctors.id", self.id)?,
                user_id: decode_id("doctors.user_id", self.user_id)?,
                specialty: self.specialty,
            },
            user: user.into_user()?,
        }))
    }
}

impl RawUserRow {
    fn from_row_at(row: &Row<'_>, start: usize) -> rusqlite::Result<Option<Self>> {
        match row.get::<_, Option<String>>(start)? {
            Some(id) => Ok(Some(Self {
                id,
                email: row.get(start + 1)?,
                first_name: row.get(start + 2)?,
                last_name: row.get(start + 3)?,
            })),
            None => Ok(None),
        }
    }

    fn into_user(self) -> StoreResult<User> {
        Ok(User {
            id: decode_id("users.id", self.id)?,
            email: decode_text("users.email", self.email)?,
            first_name: decode_text("users.first_name", self.first_name)?,
            last_name: decode_text("users.last_name", self.last_name)?,
        })
    }
}

// ============================================================================
// QUERIES
// ============================================================================

/// Builds the `WHERE` clause for `predicate` with positional parameters.
fn where_clause(predicate: &ConsultationPredicate) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    let mut push = |sql: &str, value: String| {
        values.push(value);
        clauses.push(format!("{} ?{}", sql, values.len()));
    };

    if let Some(person_id) = predicate.person_id {
        push("c.person_id =", person_id.to_string());
    }
    if let Some(doctor_id) = predicate.doctor_id {
        push("c.doctor_id =", doctor_id.to_string());
    }
    if let Some(status) = predicate.status {
        push("c.status =", status.as_str().to_string());
    }
    if let Some(clause) = predicate.date_time_utc {
        if let Some(from) = clause.lower() {
            push("c.date_time_utc >=", encode_instant(&from));
        }
        if let Some(to) = clause.upper() {
            push("c.date_time_utc <=", encode_instant(&to));
        }
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn select_consultation(
    conn: &Connection,
    id: RecordId,
    include: Include,
) -> StoreResult<Option<ConsultationDetails>> {
    let sql = format!("{CONSULTATION_SELECT} WHERE c.id = ?1");
    conn.query_row(&sql, params![id.to_string()], RawConsultationRow::from_row)
        .optional()?
        .map(|raw| raw.into_details(include))
        .transpose()
}

fn select_doctor(conn: &Connection, id: RecordId) -> StoreResult<Option<DoctorWithUser>> {
    conn.query_row(DOCTOR_SELECT, params![id.to_string()], RawDoctorRow::from_row)
        .optional()?
        .map(RawDoctorRow::into_doctor)
        .transpose()
        .map(Option::flatten)
}

fn require_consultation(
    conn: &Connection,
    id: RecordId,
    include: Include,
) -> StoreResult<ConsultationDetails> {
    select_consultation(conn, id, include)?.ok_or_else(|| StoreError::MissingRow {
        kind: EntityKind::Consultation,
        id: id.to_string(),
    })
}

#[async_trait]
impl ConsultationStore for SqliteStore {
    async fn find_person(&self, id: RecordId) -> StoreResult<Option<Person>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, first_name, last_name, birth_date, phone FROM persons WHERE id = ?1",
                params![id.to_string()],
                RawPersonRow::from_row,
            )
            .optional()?
            .map(RawPersonRow::into_person)
            .transpose()
        })
    }

    async fn find_doctor(&self, id: RecordId) -> StoreResult<Option<DoctorWithUser>> {
        self.with_conn(|conn| select_doctor(conn, id))
    }

    async fn insert_person(&self, person: NewPerson) -> StoreResult<Person> {
        let person = Person {
            id: RecordId::new(),
            first_name: person.first_name,
            last_name: person.last_name,
            birth_date: person.birth_date,
            phone: person.phone,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO persons (id, first_name, last_name, birth_date, phone)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    person.id.to_string(),
                    person.first_name.as_str(),
                    person.last_name.as_str(),
                    person.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    person.phone,
                ],
            )?;
            Ok(())
        })?;

        Ok(person)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let user = User {
            id: RecordId::new(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, first_name, last_name) VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id.to_string(),
                    user.email.as_str(),
                    user.first_name.as_str(),
                    user.last_name.as_str(),
                ],
            )?;
            Ok(())
        })?;

        Ok(user)
    }

    async fn insert_doctor(&self, doctor: NewDoctor) -> StoreResult<DoctorWithUser> {
        let id = RecordId::new();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO doctors (id, user_id, specialty) VALUES (?1, ?2, ?3)",
                params![id.to_string(), doctor.user_id.to_string(), doctor.specialty],
            )?;
            select_doctor(conn, id)?.ok_or_else(|| StoreError::MissingRow {
                kind: EntityKind::Doctor,
                id: id.to_string(),
            })
        })
    }

    async fn find_consultation(
        &self,
        id: RecordId,
        include: Include,
    ) -> StoreResult<Option<ConsultationDetails>> {
        self.with_conn(|conn| select_consultation(conn, id, include))
    }

    async fn find_consultations(
        &self,
        predicate: &ConsultationPredicate,
        include: Include,
    ) -> StoreResult<Vec<ConsultationDetails>> {
        let (filter_sql, values) = where_clause(predicate);
        let sql = format!("{CONSULTATION_SELECT}{filter_sql} ORDER BY c.date_time_utc DESC, c.id ASC");
        tracing::debug!(%sql, params = values.len(), "querying consultations");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), RawConsultationRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|raw| raw.into_details(include))
                .collect()
        })
    }

    async fn create_consultation(
        &self,
        draft: ConsultationDraft,
        include: Include,
    ) -> StoreResult<ConsultationDetails> {
        let id = RecordId::new();

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO consultations
                     (id, person_id, doctor_id, date_time_utc, status, reason, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    draft.person_id.to_string(),
                    draft.doctor_id.to_string(),
                    encode_instant(&draft.date_time_utc),
                    draft.status.as_str(),
                    draft.reason,
                    draft.notes,
                ],
            )?;
            let details = require_consultation(&tx, id, include)?;
            tx.commit()?;
            Ok(details)
        })
    }

    async fn update_consultation(
        &self,
        id: RecordId,
        changes: ConsultationChanges,
        include: Include,
    ) -> StoreResult<ConsultationDetails> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            let mut updated = require_consultation(&tx, id, include)?.consultation;
            changes.apply_to(&mut updated);

            tx.execute(
                "UPDATE consultations
                 SET person_id = ?2, doctor_id = ?3, date_time_utc = ?4,
                     status = ?5, reason = ?6, notes = ?7
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    updated.person_id.to_string(),
                    updated.doctor_id.to_string(),
                    encode_instant(&updated.date_time_utc),
                    updated.status.as_str(),
                    updated.reason,
                    updated.notes,
                ],
            )?;

            let details = require_consultation(&tx, id, include)?;
            tx.commit()?;
            Ok(details)
        })
    }

    async fn delete_consultation(&self, id: RecordId) -> StoreResult<()> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM consultations WHERE id = ?1",
                params![id.to_string()],
            )?;
            if removed == 0 {
                return Err(StoreError::MissingRow {
                    kind: EntityKind::Consultation,
                    id: id.to_string(),
                });
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::TimeClause;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    fn text(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).unwrap()
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    async fn seed(store: &dyn ConsultationStore) -> (Person, DoctorWithUser) {
        let person = store
            .insert_person(NewPerson {
                first_name: text("Amina"),
                last_name: text("Ngono"),
                birth_date: NaiveDate::from_ymd_opt(1988, 3, 2),
                phone: Some("+237 6 99 00 11 22".into()),
            })
            .await
            .expect("insert person");
        let user = store
            .insert_user(NewUser {
                email: text("p.essomba@clinic.cm"),
                first_name: text("Paul"),
                last_name: text("Essomba"),
            })
            .await
            .expect("insert user");
        let doctor = store
            .insert_doctor(NewDoctor {
                user_id: user.id,
                specialty: Some("General practice".into()),
            })
            .await
            .expect("insert doctor");
        (person, doctor)
    }

    fn draft(person: &Person, doctor: &DoctorWithUser, when: &str) -> ConsultationDraft {
        ConsultationDraft {
            person_id: person.id,
            doctor_id: doctor.doctor.id,
            date_time_utc: at(when),
            status: ConsultationStatus::Scheduled,
            reason: Some("Follow-up".into()),
            notes: None,
        }
    }

    #[test]
    fn test_open_in_memory_applies_schema() {
        let store = SqliteStore::open_in_memory().expect("open");
        assert_eq!(store.schema_version().unwrap(), 1);
        store.close().expect("close");
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let store = SqliteStore::open_in_memory().expect("open");
        store
            .with_conn(|conn| run_migrations(conn))
            .expect("re-running migrations should be a no-op");
        assert_eq!(store.schema_version().unwrap(), 1);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let store = SqliteStore::open_in_memory().expect("open");
        let fk: i64 = store
            .with_conn(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_instant_encoding_is_fixed_width_and_ordered() {
        let earlier = encode_instant(&at("2024-06-15T09:00:00Z"));
        let later = encode_instant(&at("2024-06-15T09:00:00.5Z"));

        assert_eq!(earlier, "2024-06-15T09:00:00.000000000Z");
        assert_eq!(earlier.len(), later.len());
        assert!(earlier < later);
        assert_eq!(decode_instant(earlier).unwrap(), at("2024-06-15T09:00:00Z"));
    }

    #[test]
    fn test_where_clause_numbers_parameters_in_order() {
        let person = RecordId::new();
        let predicate = ConsultationPredicate {
            person_id: Some(person),
            doctor_id: None,
            status: Some(ConsultationStatus::Completed),
            date_time_utc: Some(TimeClause::Between {
                from: at("2024-01-01T00:00:00Z"),
                to: at("2024-12-31T00:00:00Z"),
            }),
        };

        let (sql, values) = where_clause(&predicate);

        assert_eq!(
            sql,
            " WHERE c.person_id = ?1 AND c.status = ?2 AND c.date_time_utc >= ?3 AND c.date_time_utc <= ?4"
        );
        assert_eq!(values[0], person.to_string());
        assert_eq!(values[1], "COMPLETED");
        assert_eq!(values[2], "2024-01-01T00:00:00.000000000Z");
        assert_eq!(values[3], "2024-12-31T00:00:00.000000000Z");
    }

    #[test]
    fn test_empty_predicate_has_no_where_clause() {
        let (sql, values) = where_clause(&ConsultationPredicate::default());
        assert!(sql.is_empty());
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_create_returns_joined_record() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (person, doctor) = seed(&store).await;

        let details = store
            .create_consultation(
                draft(&person, &doctor, "2024-06-15T09:00:00Z"),
                Include::PersonAndDoctor,
            )
            .await
            .expect("create");

        assert_eq!(details.consultation.date_time_utc, at("2024-06-15T09:00:00Z"));
        assert_eq!(details.consultation.reason.as_deref(), Some("Follow-up"));
        assert_eq!(details.person, Some(person));
        assert_eq!(details.doctor, Some(doctor));
    }

    #[tokio::test]
    async fn test_doctor_include_omits_person() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (person, doctor) = seed(&store).await;
        let created = store
            .create_consultation(
                draft(&person, &doctor, "2024-06-15T09:00:00Z"),
                Include::PersonAndDoctor,
            )
            .await
            .unwrap();

        let found = store
            .find_consultation(created.consultation.id, Include::Doctor)
            .await
            .unwrap()
            .expect("should be found");

        assert!(found.person.is_none());
        assert_eq!(found.doctor.map(|d| d.user.email), Some(text("p.essomba@clinic.cm")));
    }

    #[tokio::test]
    async fn test_find_consultations_orders_most_recent_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (person, doctor) = seed(&store).await;
        for when in [
            "2024-03-01T08:00:00Z",
            "2024-06-15T09:00:00Z",
            "2024-01-10T14:30:00Z",
        ] {
            store
                .create_consultation(draft(&person, &doctor, when), Include::PersonAndDoctor)
                .await
                .unwrap();
        }

        let found = store
            .find_consultations(&ConsultationPredicate::default(), Include::PersonAndDoctor)
            .await
            .unwrap();
        let times: Vec<_> = found.iter().map(|d| d.consultation.date_time_utc).collect();

        assert_eq!(
            times,
            vec![
                at("2024-06-15T09:00:00Z"),
                at("2024-03-01T08:00:00Z"),
                at("2024-01-10T14:30:00Z"),
            ]
        );
    }

    #[tokio::test]
    async fn test_sub_microsecond_instants_agree_with_memory_store() {
        let sqlite = SqliteStore::open_in_memory().unwrap();
        let memory = MemoryStore::new();
        let stores: [&dyn ConsultationStore; 2] = [&sqlite, &memory];

        for store in stores {
            let (person, doctor) = seed(store).await;
            let on_the_second = store
                .create_consultation(
                    draft(&person, &doctor, "2024-06-15T09:00:00Z"),
                    Include::PersonAndDoctor,
                )
                .await
                .unwrap();
            let just_after = store
                .create_consultation(
                    draft(&person, &doctor, "2024-06-15T09:00:00.000000500Z"),
                    Include::PersonAndDoctor,
                )
                .await
                .unwrap();
            assert_eq!(
                just_after.consultation.date_time_utc,
                at("2024-06-15T09:00:00.000000500Z")
            );

            let from = ConsultationPredicate {
                date_time_utc: Some(TimeClause::From(at("2024-06-15T09:00:00.000000500Z"))),
                ..Default::default()
            };
            let found = store
                .find_consultations(&from, Include::Doctor)
                .await
                .unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].consultation.id, just_after.consultation.id);

            let to = ConsultationPredicate {
                date_time_utc: Some(TimeClause::To(at("2024-06-15T09:00:00.000000499Z"))),
                ..Default::default()
            };
            let found = store.find_consultations(&to, Include::Doctor).await.unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].consultation.id, on_the_second.consultation.id);
        }
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_rows_fail() {
        let store = SqliteStore::open_in_memory().unwrap();
        let missing = RecordId::new();

        let err = store.delete_consultation(missing).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingRow { kind: EntityKind::Consultation, .. }));

        let changes = ConsultationChanges {
            person_id: None,
            doctor_id: None,
            date_time_utc: at("2024-06-15T09:00:00Z"),
            status: None,
            reason: None,
            notes: None,
        };
        let err = store
            .update_consultation(missing, changes, Include::PersonAndDoctor)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingRow { .. }));
    }

    #[tokio::test]
    async fn test_dangling_reference_is_a_constraint_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (person, doctor) = seed(&store).await;
        let mut bad = draft(&person, &doctor, "2024-06-15T09:00:00Z");
        bad.doctor_id = RecordId::new();

        let err = store
            .create_consultation(bad, Include::PersonAndDoctor)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("consultations.db");

        let store = SqliteStore::open(&path).expect("open");
        let (person, doctor) = seed(&store).await;
        let created = store
            .create_consultation(
                draft(&person, &doctor, "2024-06-15T09:00:00Z"),
                Include::PersonAndDoctor,
            )
            .await
            .unwrap();
        store.close().expect("close");

        let reopened = SqliteStore::open(&path).expect("reopen");
        assert_eq!(reopened.schema_version().unwrap(), 1);
        let found = reopened
            .find_consultation(created.consultation.id, Include::PersonAndDoctor)
            .await
            .unwrap();
        assert_eq!(found, Some(created));
        reopened.close().unwrap();
    }
}
