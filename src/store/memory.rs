//! In-process store. Clones share the same tables, so several engines in one
//! process can migrate through it.

use std::sync::{Arc, Mutex, MutexGuard};

use rand::prelude::*;

use crate::schema::{Algorithm, CandidateRef, DiversityRecord, ProgressRecord};

use super::{EvolutionStore, StoreError};

/// A published population member.
#[derive(Debug, Clone)]
struct MemberRow {
    run_id: i64,
    algorithm: Algorithm,
    fitness: f64,
}

/// A run's final result.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalRow {
    pub run_id: i64,
    pub algorithm: Algorithm,
    pub fitness: f64,
}

#[derive(Debug)]
struct Tables {
    members: Vec<MemberRow>,
    progress: Vec<ProgressRecord>,
    diversity: Vec<DiversityRecord>,
    finals: Vec<FinalRow>,
    /// Shuffles foreign samples. Independent of any engine's random stream.
    rng: StdRng,
}

/// Shared in-memory tables.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MemoryStore {
    /// Create an empty store; `seed` drives sample ordering.
    pub fn new(seed: u64) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables {
                members: Vec::new(),
                progress: Vec::new(),
                diversity: Vec::new(),
                finals: Vec::new(),
                rng: StdRng::seed_from_u64(seed),
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Published `(program, fitness)` rows for one run.
    pub fn members_of(&self, run_id: i64) -> Vec<(Algorithm, f64)> {
        self.lock()
            .map(|t| {
                t.members
                    .iter()
                    .filter(|m| m.run_id == run_id)
                    .map(|m| (m.algorithm.clone(), m.fitness))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Logged progress records, oldest first.
    pub fn progress_records(&self) -> Vec<ProgressRecord> {
        self.lock().map(|t| t.progress.clone()).unwrap_or_default()
    }

    /// Logged diversity records, oldest first.
    pub fn diversity_records(&self) -> Vec<DiversityRecord> {
        self.lock().map(|t| t.diversity.clone()).unwrap_or_default()
    }

    /// Logged final results, oldest first.
    pub fn final_rows(&self) -> Vec<FinalRow> {
        self.lock().map(|t| t.finals.clone()).unwrap_or_default()
    }
}

impl EvolutionStore for MemoryStore {
    fn delete_run(&mut self, run_id: i64) -> Result<(), StoreError> {
        self.lock()?.members.retain(|m| m.run_id != run_id);
        Ok(())
    }

    fn insert_population(
        &mut self,
        run_id: i64,
        members: &[(CandidateRef, f64)],
    ) -> Result<usize, StoreError> {
        let mut tables = self.lock()?;
        tables
            .members
            .extend(members.iter().map(|(candidate, fitness)| MemberRow {
                run_id,
                algorithm: Algorithm::clone(candidate),
                fitness: *fitness,
            }));
        Ok(members.len())
    }

    fn fetch_foreign_sample(
        &mut self,
        run_id: i64,
        count: usize,
    ) -> Result<Vec<(Algorithm, f64)>, StoreError> {
        let mut tables = self.lock()?;
        let Tables { members, rng, .. } = &mut *tables;
        let foreign: Vec<&MemberRow> = members.iter().filter(|m| m.run_id != run_id).collect();
        Ok(foreign
            .choose_multiple(rng, count)
            .map(|m| (m.algorithm.clone(), m.fitness))
            .collect())
    }

    fn log_progress(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.lock()?.progress.push(record.clone());
        Ok(())
    }

    fn log_diversity(&mut self, records: &[DiversityRecord]) -> Result<(), StoreError> {
        self.lock()?.diversity.extend_from_slice(records);
        Ok(())
    }

    fn log_final(
        &mut self,
        run_id: i64,
        algorithm: &Algorithm,
        fitness: f64,
    ) -> Result<(), StoreError> {
        self.lock()?.finals.push(FinalRow {
            run_id,
            algorithm: algorithm.clone(),
            fitness,
        });
        Ok(())
    }

    fn fetch_best(&mut self, run_id: Option<i64>) -> Result<Option<(Algorithm, f64)>, StoreError> {
        let tables = self.lock()?;
        let published = tables.members.iter().map(|m| (m.run_id, &m.algorithm, m.fitness));
        let finals = tables.finals.iter().map(|f| (f.run_id, &f.algorithm, f.fitness));
        Ok(published
            .chain(finals)
            .filter(|(id, _, fitness)| run_id.is_none_or(|r| r == *id) && !fitness.is_nan())
            .max_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(_, algorithm, fitness)| (algorithm.clone(), fitness)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Address, Instruction, Op};

    fn program(op: u8) -> CandidateRef {
        Arc::new(Algorithm::new(
            vec![],
            vec![Instruction::new(Op(op), Address::Scalar(0), vec![])],
            vec![],
        ))
    }

    fn members(ops: &[u8]) -> Vec<(CandidateRef, f64)> {
        ops.iter().map(|&op| (program(op), op as f64)).collect()
    }

    #[test]
    fn test_foreign_sample_excludes_own_run() {
        let mut store = MemoryStore::new(1);
        store.insert_population(1, &members(&[1, 2, 3])).unwrap();
        store.insert_population(2, &members(&[4, 5, 6])).unwrap();

        let sample = store.fetch_foreign_sample(1, 10).unwrap();
        assert_eq!(sample.len(), 3);
        assert!(sample.iter().all(|(_, f)| *f >= 4.0));

        let sample = store.fetch_foreign_sample(2, 2).unwrap();
        assert_eq!(sample.len(), 2);
        assert!(sample.iter().all(|(_, f)| *f <= 3.0));
    }

    #[test]
    fn test_deleted_rows_never_migrate() {
        let mut store = MemoryStore::new(2);
        store.insert_population(7, &members(&[9, 9])).unwrap();
        store.delete_run(7).unwrap();
        assert!(store.fetch_foreign_sample(8, 10).unwrap().is_empty());
        assert!(store.members_of(7).is_empty());
    }

    #[test]
    fn test_clones_share_tables() {
        let mut a = MemoryStore::new(3);
        let mut b = a.clone();
        a.insert_population(1, &members(&[1])).unwrap();
        assert_eq!(b.fetch_foreign_sample(2, 5).unwrap().len(), 1);
    }

    #[test]
    fn test_fetch_best_across_members_and_finals() {
        let mut store = MemoryStore::new(4);
        store.insert_population(1, &members(&[3, 8])).unwrap();
        store.insert_population(2, &members(&[5])).unwrap();
        store.log_final(2, &program(20), 20.0).unwrap();

        assert_eq!(store.fetch_best(None).unwrap().unwrap().1, 20.0);
        assert_eq!(store.fetch_best(Some(1)).unwrap().unwrap().1, 8.0);
        assert!(store.fetch_best(Some(9)).unwrap().is_none());
        assert_eq!(store.final_rows().len(), 1);
    }
}
