use chrono::Utc;
use diesel::dsl::{count_star, exists};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::select;
use uuid::Uuid;

use crate::enums::{Discipline, DrawingType};
use crate::error::EngineResult;
use crate::schema::{drawings, number_sequences, transmittals};

pub fn format_drawing_number(
    project_code: &str,
    discipline: Discipline,
    drawing_type: DrawingType,
    ordinal: i32,
) -> String {
    format!(
        "{}-{}-{}-{:04}",
        project_code,
        discipline.code(),
        drawing_type.code(),
        ordinal
    )
}

pub fn format_transmittal_number(project_code: &str, ordinal: i32) -> String {
    format!("T-{project_code}-{ordinal:04}")
}

fn drawing_scope(project_id: Uuid, discipline: Discipline) -> String {
    format!("drawing:{project_id}:{}", discipline.as_str())
}

fn transmittal_scope(project_id: Uuid) -> String {
    format!("transmittal:{project_id}")
}

/// Atomically bumps the counter for `scope` and returns the new value.
///
/// Must run inside the caller's transaction. The upsert holds a row lock on
/// the counter until commit, so concurrent allocators for the same scope
/// queue behind each other instead of reading the same value. `seed` is the
/// value used when the counter does not exist yet.
fn next_value(conn: &mut PgConnection, scope: &str, seed: i32) -> QueryResult<i32> {
    let now = Utc::now().naive_utc();
    diesel::insert_into(number_sequences::table)
        .values((
            number_sequences::scope.eq(scope),
            number_sequences::last_value.eq(seed),
            number_sequences::updated_at.eq(now),
        ))
        .on_conflict(number_sequences::scope)
        .do_update()
        .set((
            number_sequences::last_value.eq(number_sequences::last_value + 1),
            number_sequences::updated_at.eq(now),
        ))
        .returning(number_sequences::last_value)
        .get_result(conn)
}

/// Issues the next unused drawing number for a project and discipline.
///
/// A fresh counter is seeded from the count of lineage roots for the pair,
/// that is the existing drawings minus the rows created by revising one
/// (`supersedes IS NOT NULL`). A revision keeps its lineage's number and never
/// consumes an ordinal. An ordinal whose rendered number is already taken in
/// the project (for example by an imported drawing) is skipped.
pub fn allocate_drawing_number(
    conn: &mut PgConnection,
    project_id: Uuid,
    project_code: &str,
    discipline: Discipline,
    drawing_type: DrawingType,
) -> EngineResult<String> {
    let scope = drawing_scope(project_id, discipline);
    let existing: i64 = drawings::table
        .filter(drawings::project_id.eq(project_id))
        .filter(drawings::discipline.eq(discipline.as_str()))
        .filter(drawings::supersedes.is_null())
        .select(count_star())
        .first(conn)?;
    let seed = i32::try_from(existing).unwrap_or(i32::MAX - 1) + 1;

    loop {
        let ordinal = next_value(conn, &scope, seed)?;
        let candidate = format_drawing_number(project_code, discipline, drawing_type, ordinal);
        let taken: bool = select(exists(
            drawings::table
                .filter(drawings::project_id.eq(project_id))
                .filter(drawings::drawing_number.eq(&candidate)),
        ))
        .get_result(conn)?;
        if !taken {
            return Ok(candidate);
        }
        tracing::debug!(drawing_number = %candidate, "skipping drawing number already in use");
    }
}

pub fn allocate_transmittal_number(
    conn: &mut PgConnection,
    project_id: Uuid,
    project_code: &str,
) -> EngineResult<String> {
    let scope = transmittal_scope(project_id);
    let existing: i64 = transmittals::table
        .filter(transmittals::project_id.eq(project_id))
        .select(count_star())
        .first(conn)?;
    let seed = i32::try_from(existing).unwrap_or(i32::MAX - 1) + 1;

    loop {
        let ordinal = next_value(conn, &scope, seed)?;
        let candidate = format_transmittal_number(project_code, ordinal);
        let taken: bool = select(exists(
            transmittals::table.filter(transmittals::transmittal_number.eq(&candidate)),
        ))
        .get_result(conn)?;
        if !taken {
            return Ok(candidate);
        }
    }
}
