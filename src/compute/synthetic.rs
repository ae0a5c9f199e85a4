//! Built-in synthetic objective: random programs scored by how closely their
//! opcode-category mix matches a target mix.
//!
//! This stands in for a real learning task so the engine can be run and
//! benchmarked end to end. Every evaluation call counts as one train step.

use std::sync::Arc;

use crate::schema::{
    Address, Algorithm, CandidateRef, CategoryHistogram, Instruction, Op, OpCategory, Section,
    SyntheticConfig,
};

use super::evolution::{Evaluator, Generator, MutationIntensity, Mutator, RandomSource};

/// Maximum number of input operands per instruction.
const MAX_INPUTS: usize = 2;

fn random_address(rng: &mut RandomSource, num_addresses: u8) -> Address {
    let index = rng.uniform_index(num_addresses as usize) as u8;
    match rng.uniform_index(3) {
        0 => Address::Scalar(index),
        1 => Address::Vector(index),
        _ => Address::Matrix(index),
    }
}

fn random_instruction(rng: &mut RandomSource, num_addresses: u8) -> Instruction {
    let op = Op(rng.uniform_index(Op::MAX_CATEGORIZED as usize + 1) as u8);
    let out = random_address(rng, num_addresses);
    let inputs = (0..rng.uniform_between(0, MAX_INPUTS))
        .map(|_| random_address(rng, num_addresses))
        .collect();
    Instruction::new(op, out, inputs)
}

fn section_bounds(config: &SyntheticConfig, section: Section) -> (usize, usize) {
    match section {
        Section::Setup => config.setup_size,
        Section::Predict => config.predict_size,
        Section::Learn => config.learn_size,
    }
}

/// Generates seed programs with section lengths drawn from the configured bounds.
#[derive(Debug, Clone)]
pub struct RandomProgramGenerator {
    config: SyntheticConfig,
}

impl RandomProgramGenerator {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }
}

impl Generator for RandomProgramGenerator {
    fn new_seed_candidate(&mut self, rng: &mut RandomSource) -> Algorithm {
        let mut algorithm = Algorithm::default();
        for section in Section::ALL {
            let (lo, hi) = section_bounds(&self.config, section);
            let len = rng.uniform_between(lo, hi);
            *algorithm.section_mut(section) = (0..len)
                .map(|_| random_instruction(rng, self.config.num_addresses))
                .collect();
        }
        algorithm
    }
}

/// Point mutation over one randomly chosen section.
#[derive(Debug, Clone)]
pub struct InstructionMutator {
    config: SyntheticConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Alter,
    Insert,
    Remove,
}

impl InstructionMutator {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    /// Pick an action that keeps the section inside its bounds.
    fn legal_action(&self, wanted: Action, len: usize, bounds: (usize, usize)) -> Option<Action> {
        let legal = |action| match action {
            Action::Alter => len > 0,
            Action::Insert => len < bounds.1,
            Action::Remove => len > bounds.0,
        };
        [wanted, Action::Alter, Action::Insert, Action::Remove]
            .into_iter()
            .find(|&a| legal(a))
    }
}

impl Mutator for InstructionMutator {
    fn mutate(
        &mut self,
        intensity: MutationIntensity,
        parent: &CandidateRef,
        rng: &mut RandomSource,
    ) -> CandidateRef {
        if intensity == MutationIntensity::Neutral {
            rng.uniform_seed();
            return Arc::clone(parent);
        }

        let section = Section::ALL[rng.uniform_index(Section::ALL.len())];
        let wanted = [Action::Alter, Action::Insert, Action::Remove][rng.uniform_index(3)];
        let bounds = section_bounds(&self.config, section);
        let len = parent.section(section).len();

        let Some(action) = self.legal_action(wanted, len, bounds) else {
            return Arc::clone(parent);
        };

        let mut child = Algorithm::clone(parent);
        let instructions = child.section_mut(section);
        match action {
            Action::Alter => {
                let at = rng.uniform_index(len);
                instructions[at] = random_instruction(rng, self.config.num_addresses);
            }
            Action::Insert => {
                let at = rng.uniform_between(0, len);
                instructions.insert(at, random_instruction(rng, self.config.num_addresses));
            }
            Action::Remove => {
                instructions.remove(rng.uniform_index(len));
            }
        }
        Arc::new(child)
    }
}

/// Scores programs by `1 - 0.5 * L1(category mix - target mix)`, in `[0, 1]`.
///
/// The early tier looks at the predict section only.
#[derive(Debug, Clone)]
pub struct HistogramEvaluator {
    target: [f64; 5],
    steps: u64,
}

impl HistogramEvaluator {
    pub fn new(config: &SyntheticConfig) -> Self {
        let total: f64 = config.target_mix.iter().sum();
        let target = config.target_mix.map(|w| w / total);
        Self { target, steps: 0 }
    }

    fn score(&self, histogram: &CategoryHistogram) -> f64 {
        let total = histogram.total();
        if total == 0 {
            return 0.0;
        }
        let distance: f64 = OpCategory::ALL
            .iter()
            .zip(&self.target)
            .map(|(&c, t)| (histogram.get(c) as f64 / total as f64 - t).abs())
            .sum();
        1.0 - 0.5 * distance
    }
}

impl Evaluator for HistogramEvaluator {
    fn evaluate(&mut self, algorithm: &Algorithm) -> f64 {
        self.steps += 1;
        self.score(&algorithm.category_histogram())
    }

    fn early_evaluate(&mut self, algorithm: &Algorithm) -> f64 {
        self.steps += 1;
        let mut histogram = CategoryHistogram::default();
        for category in algorithm.predict.iter().filter_map(|i| i.op.category()) {
            histogram.record(category);
        }
        self.score(&histogram)
    }

    fn num_train_steps_completed(&self) -> u64 {
        self.steps
    }
}
