//! SQLite store implementation.

use crate::{
    Appointment, Error, Medication, NewAppointment, NewMedication, NewUser, PanicLog, Result, User,
};
use chrono::{DateTime, Utc};
use policy::Role;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

const USER_COLUMNS: &str =
    "id, username, password, full_name, role, is_blocked, subscription_end_date, created_at";

/// SQLite-backed store for accounts and their care records.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                full_name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                is_blocked INTEGER NOT NULL DEFAULT 0,
                subscription_end_date TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS medications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                dosage TEXT NOT NULL,
                time TEXT NOT NULL,
                frequency TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            );
            CREATE TABLE IF NOT EXISTS appointments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                date TEXT NOT NULL,
                location TEXT,
                notes TEXT
            );
            CREATE TABLE IF NOT EXISTS panic_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                triggered_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_medications_user ON medications(user_id);
            CREATE INDEX IF NOT EXISTS idx_appointments_user ON appointments(user_id);
            CREATE INDEX IF NOT EXISTS idx_panic_logs_user ON panic_logs(user_id, triggered_at);
            "#,
        )?;
        Ok(())
    }

    // ---- users ----

    /// Insert a new, unblocked account.
    pub fn create_user(
        &self,
        user: &NewUser,
        role: Role,
        created_at: DateTime<Utc>,
        subscription_end: DateTime<Utc>,
    ) -> Result<User> {
        let inserted = self.conn.execute(
            "INSERT INTO users (username, password, full_name, role, is_blocked, subscription_end_date, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
            params![
                user.username,
                user.password_hash,
                user.full_name,
                role.as_str(),
                subscription_end.to_rfc3339(),
                created_at.to_rfc3339(),
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                return Err(Error::DuplicateUsername(user.username.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        let id = self.conn.last_insert_rowid();
        self.get_user(id)?
            .ok_or_else(|| Error::Corrupt(format!("user {id} missing after insert")))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        self.conn
            .query_row(&sql, [id], UserRow::from_row)
            .optional()?
            .map(UserRow::into_user)
            .transpose()
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        self.conn
            .query_row(&sql, [username], UserRow::from_row)
            .optional()?
            .map(UserRow::into_user)
            .transpose()
    }

    /// All accounts, oldest first.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], UserRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Set the blocked flag. Returns `None` if no such user exists.
    pub fn set_blocked(&self, id: i64, blocked: bool) -> Result<Option<User>> {
        let changed = self.conn.execute(
            "UPDATE users SET is_blocked = ?1 WHERE id = ?2",
            params![blocked, id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_user(id)
    }

    // ---- medications ----

    pub fn list_medications(&self, user_id: i64) -> Result<Vec<Medication>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, dosage, time, frequency, active FROM medications
             WHERE user_id = ?1 ORDER BY time, id",
        )?;
        let meds = stmt
            .query_map([user_id], |row| {
                Ok(Medication {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    dosage: row.get(3)?,
                    time: row.get(4)?,
                    frequency: row.get(5)?,
                    active: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(meds)
    }

    pub fn create_medication(&self, user_id: i64, med: &NewMedication) -> Result<Medication> {
        self.conn.execute(
            "INSERT INTO medications (user_id, name, dosage, time, frequency, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![user_id, med.name, med.dosage, med.time, med.frequency, med.active],
        )?;
        Ok(Medication {
            id: self.conn.last_insert_rowid(),
            user_id,
            name: med.name.clone(),
            dosage: med.dosage.clone(),
            time: med.time.clone(),
            frequency: med.frequency.clone(),
            active: med.active,
        })
    }

    /// Delete a medication owned by `user_id`. Returns false if none matched.
    pub fn delete_medication(&self, user_id: i64, id: i64) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM medications WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }

    // ---- appointments ----

    pub fn list_appointments(&self, user_id: i64) -> Result<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, date, location, notes FROM appointments
             WHERE user_id = ?1 ORDER BY date, id",
        )?;
        let rows = stmt
            .query_map([user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, user_id, title, date, location, notes)| {
                Ok(Appointment {
                    id,
                    user_id,
                    title,
                    date: parse_timestamp(&date)?,
                    location,
                    notes,
                })
            })
            .collect()
    }

    pub fn create_appointment(&self, user_id: i64, appt: &NewAppointment) -> Result<Appointment> {
        self.conn.execute(
            "INSERT INTO appointments (user_id, title, date, location, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                appt.title,
                appt.date.to_rfc3339(),
                appt.location,
                appt.notes
            ],
        )?;
        Ok(Appointment {
            id: self.conn.last_insert_rowid(),
            user_id,
            title: appt.title.clone(),
            date: appt.date,
            location: appt.location.clone(),
            notes: appt.notes.clone(),
        })
    }

    /// Delete an appointment owned by `user_id`. Returns false if none matched.
    pub fn delete_appointment(&self, user_id: i64, id: i64) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM appointments WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }

    // ---- panic ----

    pub fn create_panic_log(&self, user_id: i64, triggered_at: DateTime<Utc>) -> Result<PanicLog> {
        self.conn.execute(
            "INSERT INTO panic_logs (user_id, triggered_at) VALUES (?1, ?2)",
            params![user_id, triggered_at.to_rfc3339()],
        )?;
        Ok(PanicLog {
            id: self.conn.last_insert_rowid(),
            user_id,
            triggered_at,
        })
    }

    pub fn count_panic_logs(&self, user_id: i64) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM panic_logs WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Wrap the store for sharing across request tasks.
    pub fn shared(self) -> SharedStore {
        SharedStore(Arc::new(Mutex::new(self)))
    }
}

/// A [`Store`] behind a mutex. The lock serializes every write, so two
/// concurrent block toggles on one account land one after the other.
#[derive(Clone)]
pub struct SharedStore(Arc<Mutex<Store>>);

impl SharedStore {
    /// Run `f` with exclusive access to the store.
    pub fn with<T>(&self, f: impl FnOnce(&Store) -> Result<T>) -> Result<T> {
        let store = self.0.lock().map_err(|_| Error::Poisoned)?;
        f(&store)
    }
}

struct UserRow {
    id: i64,
    username: String,
    password: String,
    full_name: String,
    role: String,
    is_blocked: bool,
    subscription_end_date: String,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            password: row.get(2)?,
            full_name: row.get(3)?,
            role: row.get(4)?,
            is_blocked: row.get(5)?,
            subscription_end_date: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_user(self) -> Result<User> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| {
                Error::Corrupt(format!("user {}: unknown role '{}'", self.id, self.role))
            })?;
        Ok(User {
            id: self.id,
            username: self.username,
            password_hash: self.password,
            full_name: self.full_name,
            role,
            blocked: self.is_blocked,
            subscription_end: parse_timestamp(&self.subscription_end_date)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("bad timestamp '{raw}': {e}")))
}
