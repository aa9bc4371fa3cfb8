use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await?;
    Ok(pool)
}

// Uniqueness lives in the schema: duplicate emails/roll numbers and duplicate
// (student, day) marks are rejected by the store even when two requests pass
// the handler-level existence checks at the same time.
pub async fn prepare_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS students(
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            roll_number TEXT NOT NULL,
            email TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            photo_url TEXT,
            role TEXT NOT NULL DEFAULT 'student',
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            UNIQUE(email),
            UNIQUE(roll_number)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS attendance(
            id UUID PRIMARY KEY,
            student_id UUID NOT NULL REFERENCES students(id),
            roll_number TEXT NOT NULL,
            student_name TEXT NOT NULL,
            date DATE NOT NULL,
            timestamp TIMESTAMPTZ NOT NULL,
            method TEXT NOT NULL DEFAULT 'manual',
            marked_at TIMESTAMPTZ NOT NULL,
            UNIQUE(student_id, date)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance(student_id)")
        .execute(pool)
        .await?;

    Ok(())
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}
