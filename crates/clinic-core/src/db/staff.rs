//! Staff database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Staff, StaffRole};

/// Intermediate row struct for database mapping.
struct StaffRow {
    staff_id: String,
    employee_number: String,
    full_name: String,
    role: String,
    deleted: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<StaffRow> for Staff {
    type Error = DbError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        let role = StaffRole::parse(&row.role)
            .ok_or_else(|| DbError::Constraint(format!("Unknown staff role: {}", row.role)))?;
        Ok(Staff {
            staff_id: row.staff_id,
            employee_number: row.employee_number,
            full_name: row.full_name,
            role,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl Database {
    /// Insert a new staff member.
    pub fn insert_staff(&self, staff: &Staff) -> DbResult<()> {
        self.conn().execute(
            r#"
            INSERT INTO staff (
                staff_id, employee_number, full_name, role, deleted, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                staff.staff_id,
                staff.employee_number,
                staff.full_name,
                staff.role.as_str(),
                staff.deleted,
                staff.created_at,
                staff.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a staff member by id. Tombstoned rows are invisible here.
    pub fn get_staff(&self, staff_id: &str) -> DbResult<Option<Staff>> {
        self.conn()
            .query_row(
                r#"
                SELECT staff_id, employee_number, full_name, role, deleted, created_at, updated_at
                FROM staff
                WHERE staff_id = ? AND deleted = 0
                "#,
                [staff_id],
                |row| {
                    Ok(StaffRow {
                        staff_id: row.get(0)?,
                        employee_number: row.get(1)?,
                        full_name: row.get(2)?,
                        role: row.get(3)?,
                        deleted: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List live staff, optionally restricted to one role.
    pub fn list_staff(&self, role: Option<StaffRole>) -> DbResult<Vec<Staff>> {
        let (sql, args) = match role {
            Some(r) => (
                r#"
                SELECT staff_id, employee_number, full_name, role, deleted, created_at, updated_at
                FROM staff
                WHERE deleted = 0 AND role = ?1
                ORDER BY full_name
                "#,
                vec![r.as_str().to_string()],
            ),
            None => (
                r#"
                SELECT staff_id, employee_number, full_name, role, deleted, created_at, updated_at
                FROM staff
                WHERE deleted = 0
                ORDER BY full_name
                "#,
                vec![],
            ),
        };

        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), |row| {
            Ok(StaffRow {
                staff_id: row.get(0)?,
                employee_number: row.get(1)?,
                full_name: row.get(2)?,
                role: row.get(3)?,
                deleted: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?;

        let mut staff = Vec::new();
        for row in rows {
            staff.push(row?.try_into()?);
        }
        Ok(staff)
    }

    /// Soft-delete a staff member.
    pub fn soft_delete_staff(&self, staff_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn().execute(
            "UPDATE staff SET deleted = 1, updated_at = datetime('now') WHERE staff_id = ? AND deleted = 0",
            [staff_id],
        )?;
        Ok(rows_affected > 0)
    }
}
