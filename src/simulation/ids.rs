//! Integer handles for genomes and genes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a genome instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenomeId(pub u64);

/// Identifier of a node or muscle gene, unique within a population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneId(pub u64);

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

impl fmt::Display for GeneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Hands out monotonically increasing ids, scoped to one population.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next_genome: u64,
    next_gene: u64,
}

impl IdAllocator {
    /// Creates an allocator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh genome id.
    pub fn genome(&mut self) -> GenomeId {
        let id = GenomeId(self.next_genome);
        self.next_genome += 1;
        id
    }

    /// Returns a fresh gene id.
    pub fn gene(&mut self) -> GeneId {
        let id = GeneId(self.next_gene);
        self.next_gene += 1;
        id
    }

    /// Number of genome ids issued so far.
    pub fn genomes_issued(&self) -> u64 {
        self.next_genome
    }
}
