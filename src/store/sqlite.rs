//! SQLite-backed store shared by concurrent runs on one machine or filesystem.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};

use crate::schema::{Algorithm, CandidateRef, DiversityRecord, ProgressRecord, Section};

use super::{EvolutionStore, StoreError};

/// How long a writer waits on a peer's lock before the call fails.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS algs (
    id INTEGER PRIMARY KEY,
    evol_id INTEGER NOT NULL,
    setup TEXT,
    predict TEXT,
    learn TEXT,
    blob_alg TEXT NOT NULL,
    fitness REAL
);
CREATE INDEX IF NOT EXISTS algs_evol_id ON algs (evol_id);
CREATE TABLE IF NOT EXISTS diversity (
    id INTEGER PRIMARY KEY,
    evol_id INTEGER NOT NULL,
    num_indivs INTEGER,
    total_ops INTEGER,
    setup_ops INTEGER,
    predict_ops INTEGER,
    learn_ops INTEGER,
    total_vars INTEGER,
    scalar_vars INTEGER,
    vector_vars INTEGER,
    matrix_vars INTEGER,
    arith_ops INTEGER,
    trig_ops INTEGER,
    precalc_ops INTEGER,
    linearalg_ops INTEGER,
    probstat_ops INTEGER,
    diversity_score REAL,
    fitness REAL,
    alg_str TEXT
);
CREATE TABLE IF NOT EXISTS progress (
    id INTEGER PRIMARY KEY,
    evol_id INTEGER NOT NULL,
    num_indivs INTEGER,
    elapsed_secs INTEGER,
    mean REAL,
    stdev REAL,
    best_fit REAL,
    best_overall REAL,
    bestfit_diversity REAL,
    mean_diversity REAL,
    best_alg_str TEXT
);
CREATE TABLE IF NOT EXISTS final_results (
    id INTEGER PRIMARY KEY,
    evol_id INTEGER NOT NULL,
    alg_str TEXT,
    blob_alg TEXT NOT NULL,
    fitness REAL
);
";

/// Store backed by a SQLite database file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

/// Concatenated instruction text of one section, for human inspection.
fn section_text(algorithm: &Algorithm, section: Section) -> String {
    algorithm
        .section(section)
        .iter()
        .map(|i| format!("{};", i))
        .collect()
}

/// SQLite stores NaN as NULL.
fn fitness_from_sql(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

impl EvolutionStore for SqliteStore {
    fn delete_run(&mut self, run_id: i64) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM algs WHERE evol_id = ?1", params![run_id])?;
        Ok(())
    }

    fn insert_population(
        &mut self,
        run_id: i64,
        members: &[(CandidateRef, f64)],
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO algs (evol_id, setup, predict, learn, blob_alg, fitness)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (candidate, fitness) in members {
                stmt.execute(params![
                    run_id,
                    section_text(candidate, Section::Setup),
                    section_text(candidate, Section::Predict),
                    section_text(candidate, Section::Learn),
                    serde_json::to_string(&**candidate)?,
                    fitness,
                ])?;
            }
        }
        tx.commit()?;
        Ok(members.len())
    }

    fn fetch_foreign_sample(
        &mut self,
        run_id: i64,
        count: usize,
    ) -> Result<Vec<(Algorithm, f64)>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT blob_alg, fitness FROM algs
             WHERE evol_id != ?1 ORDER BY random() LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![run_id, count as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?))
        })?;

        let mut sample = Vec::new();
        for row in rows {
            let (blob, fitness) = row?;
            sample.push((serde_json::from_str(&blob)?, fitness_from_sql(fitness)));
        }
        Ok(sample)
    }

    fn log_progress(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO progress (evol_id, num_indivs, elapsed_secs, mean, stdev, best_fit,
                                   best_overall, bestfit_diversity, mean_diversity, best_alg_str)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.run_id,
                record.num_individuals as i64,
                record.elapsed_secs as i64,
                record.mean,
                record.stdev,
                record.best_fitness,
                record.best_overall,
                record.best_diversity,
                record.mean_diversity,
                record.best_program,
            ],
        )?;
        Ok(())
    }

    fn log_diversity(&mut self, records: &[DiversityRecord]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO diversity (evol_id, num_indivs, total_ops, setup_ops, predict_ops,
                                        learn_ops, total_vars, scalar_vars, vector_vars,
                                        matrix_vars, arith_ops, trig_ops, precalc_ops,
                                        linearalg_ops, probstat_ops, diversity_score, fitness,
                                        alg_str)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18)",
            )?;
            for r in records {
                stmt.execute(params![
                    r.run_id,
                    r.num_individuals as i64,
                    r.total_ops as i64,
                    r.setup_ops as i64,
                    r.predict_ops as i64,
                    r.learn_ops as i64,
                    r.variables.total() as i64,
                    r.variables.scalar as i64,
                    r.variables.vector as i64,
                    r.variables.matrix as i64,
                    r.categories.arithmetic as i64,
                    r.categories.trigonometric as i64,
                    r.categories.precalculated as i64,
                    r.categories.linear_algebra as i64,
                    r.categories.probability_statistics as i64,
                    r.diversity,
                    r.fitness,
                    r.program,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn log_final(
        &mut self,
        run_id: i64,
        algorithm: &Algorithm,
        fitness: f64,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO final_results (evol_id, alg_str, blob_alg, fitness)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                run_id,
                algorithm.to_readable(),
                serde_json::to_string(algorithm)?,
                fitness
            ],
        )?;
        Ok(())
    }

    fn fetch_best(&mut self, run_id: Option<i64>) -> Result<Option<(Algorithm, f64)>, StoreError> {
        let best = self
            .conn
            .query_row(
                "SELECT blob_alg, fitness FROM (
                     SELECT evol_id, blob_alg, fitness FROM algs
                     UNION ALL
                     SELECT evol_id, blob_alg, fitness FROM final_results
                 )
                 WHERE fitness IS NOT NULL AND (?1 IS NULL OR evol_id = ?1)
                 ORDER BY fitness DESC LIMIT 1",
                params![run_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )
            .optional()?;

        match best {
            Some((blob, fitness)) => Ok(Some((serde_json::from_str(&blob)?, fitness))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Address, Instruction, Op};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn program(op: u8) -> CandidateRef {
        Arc::new(Algorithm::new(
            vec![Instruction::new(Op(op), Address::Scalar(1), vec![Address::Scalar(0)])],
            vec![Instruction::new(Op(op), Address::Vector(2), vec![])],
            vec![],
        ))
    }

    fn members(ops: &[u8]) -> Vec<(CandidateRef, f64)> {
        ops.iter().map(|&op| (program(op), op as f64 / 10.0)).collect()
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runs.db3");

        let mut writer = SqliteStore::open(&path).unwrap();
        assert_eq!(writer.insert_population(1, &members(&[3, 4])).unwrap(), 2);

        let mut reader = SqliteStore::open(&path).unwrap();
        let mut sample = reader.fetch_foreign_sample(2, 10).unwrap();
        sample.sort_by(|a, b| a.1.total_cmp(&b.1));
        assert_eq!(sample.len(), 2);
        assert_eq!(sample[0].0, *program(3));
        assert_eq!(sample[1].1, 0.4);
    }

    #[test]
    fn test_delete_then_fetch_excludes_run() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_population(1, &members(&[1, 2, 3])).unwrap();
        store.insert_population(2, &members(&[5, 6])).unwrap();

        assert_eq!(store.fetch_foreign_sample(2, 10).unwrap().len(), 3);
        store.delete_run(1).unwrap();
        assert!(store.fetch_foreign_sample(2, 10).unwrap().is_empty());
        assert_eq!(store.fetch_foreign_sample(1, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_nan_fitness_survives_as_nan() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_population(1, &[(program(1), f64::NAN)])
            .unwrap();
        let sample = store.fetch_foreign_sample(2, 1).unwrap();
        assert!(sample[0].1.is_nan());
    }

    #[test]
    fn test_logs_and_best() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_population(1, &members(&[2, 7])).unwrap();
        store.log_final(1, &program(9), 0.95).unwrap();
        store
            .log_diversity(&[DiversityRecord::describe(1, 10, &program(2), 0.5, 0.2)])
            .unwrap();
        store
            .log_progress(&ProgressRecord {
                run_id: 1,
                num_individuals: 10,
                elapsed_secs: 0,
                mean: 0.45,
                stdev: 0.25,
                best_fitness: 0.7,
                best_overall: 0.7,
                best_diversity: 0.0,
                mean_diversity: 0.0,
                best_program: program(7).to_readable(),
            })
            .unwrap();

        let (best, fitness) = store.fetch_best(None).unwrap().unwrap();
        assert_eq!(best, *program(9));
        assert_eq!(fitness, 0.95);
        assert!(store.fetch_best(Some(4)).unwrap().is_none());

        let rows: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM diversity", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
