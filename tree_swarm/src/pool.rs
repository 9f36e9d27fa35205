//! Fixed-size agent pools.
//!
//! A pool owns every agent of one visual kind. Cardinality is fixed when the
//! pool is populated and only changes through a full [`AgentPool::rebuild`],
//! so renderer instance buffers never have to be resized mid-session.

use std::fmt;

use glam::{Quat, Vec3};
use rand::Rng;

use crate::error::{PoolError, PoolResult};
use crate::formation::FormationField;

// ════════════════════════════════════════════════════════════════════════════
// Agent
// ════════════════════════════════════════════════════════════════════════════

/// One independently animated entity.
///
/// `chaos` and `formation` are fixed at spawn; everything else is animation
/// state advanced by the motion integrator.
#[derive(Clone, Debug)]
pub struct Agent<P> {
    pub chaos:     Vec3,
    pub formation: Vec3,
    pub position:  Vec3,
    pub rotation:  Quat,
    pub scale:     f32,
    /// Derived emissive / glow level, recomputed every frame.
    pub intensity: f32,
    /// Static per-agent randomized parameters.
    pub params:    P,
}

impl<P> Agent<P> {
    /// A fresh agent resting at its chaos position.
    pub fn at_chaos(chaos: Vec3, formation: Vec3, scale: f32, params: P) -> Self {
        Agent {
            chaos,
            formation,
            position:  chaos,
            rotation:  Quat::IDENTITY,
            scale,
            intensity: 0.0,
            params,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AgentKind — how a pool spawns its agents
// ════════════════════════════════════════════════════════════════════════════

/// Kind parameters for one pool: how to randomize a new agent.
pub trait AgentKind {
    type Params: Clone + fmt::Debug + Send + Sync;

    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Create agent `index`, drawing its chaos and formation positions.
    fn spawn<R: Rng>(&self, index: usize, field: &FormationField, rng: &mut R)
        -> Agent<Self::Params>;
}

// ════════════════════════════════════════════════════════════════════════════
// AgentPool
// ════════════════════════════════════════════════════════════════════════════

pub struct AgentPool<K: AgentKind> {
    kind:   K,
    count:  usize,
    agents: Option<Vec<Agent<K::Params>>>,
}

impl<K: AgentKind> AgentPool<K> {
    /// Declare a pool of `count` agents without spawning them yet.
    pub fn new(kind: K, count: usize) -> PoolResult<Self> {
        if count == 0 {
            return Err(PoolError::ZeroCount { pool: kind.name() });
        }
        Ok(AgentPool { kind, count, agents: None })
    }

    /// Declare and populate in one step.
    pub fn create<R: Rng>(
        kind:  K,
        count: usize,
        field: &FormationField,
        rng:   &mut R,
    ) -> PoolResult<Self> {
        let mut pool = Self::new(kind, count)?;
        pool.populate(field, rng);
        Ok(pool)
    }

    /// Spawn every agent. Calling this again re-randomizes the whole pool.
    pub fn populate<R: Rng>(&mut self, field: &FormationField, rng: &mut R) {
        let agents = (0..self.count)
            .map(|i| self.kind.spawn(i, field, rng))
            .collect::<Vec<_>>();
        log::debug!("pool `{}` populated with {} agents", self.kind.name(), agents.len());
        self.agents = Some(agents);
    }

    /// Full rebuild with a new cardinality.
    pub fn rebuild<R: Rng>(
        &mut self,
        count: usize,
        field: &FormationField,
        rng:   &mut R,
    ) -> PoolResult<()> {
        if count == 0 {
            return Err(PoolError::ZeroCount { pool: self.kind.name() });
        }
        self.count = count;
        self.populate(field, rng);
        Ok(())
    }

    pub fn kind(&self)         -> &K    { &self.kind }
    pub fn name(&self)         -> &'static str { self.kind.name() }
    pub fn len(&self)          -> usize { self.count }
    pub fn is_empty(&self)     -> bool  { self.count == 0 }
    pub fn is_populated(&self) -> bool  { self.agents.is_some() }

    /// Agents in creation order.
    pub fn iter(&self) -> PoolResult<std::slice::Iter<'_, Agent<K::Params>>> {
        Ok(self.agents()?.iter())
    }

    pub fn agents(&self) -> PoolResult<&[Agent<K::Params>]> {
        self.agents.as_deref().ok_or(PoolError::InvalidPoolState { pool: self.kind.name() })
    }

    pub fn agents_mut(&mut self) -> PoolResult<&mut [Agent<K::Params>]> {
        let pool = self.kind.name();
        self.agents.as_deref_mut().ok_or(PoolError::InvalidPoolState { pool })
    }

    /// Kind and agents borrowed together, for integrators that need both.
    pub(crate) fn parts_mut(&mut self) -> PoolResult<(&K, &mut [Agent<K::Params>])> {
        let pool = self.kind.name();
        match self.agents.as_deref_mut() {
            Some(agents) => Ok((&self.kind, agents)),
            None         => Err(PoolError::InvalidPoolState { pool }),
        }
    }

    /// Visit every agent with its index, in creation order.
    pub fn for_each<F>(&self, mut f: F) -> PoolResult<()>
    where
        F: FnMut(usize, &Agent<K::Params>),
    {
        for (i, agent) in self.iter()?.enumerate() {
            f(i, agent);
        }
        Ok(())
    }
}

impl<K: AgentKind> fmt::Debug for AgentPool<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentPool")
            .field("kind", &self.kind.name())
            .field("count", &self.count)
            .field("populated", &self.is_populated())
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formation::Placement;
    use rand::{rngs::StdRng, SeedableRng};

    #[derive(Debug)]
    struct Dots;

    impl AgentKind for Dots {
        type Params = usize;
        fn name(&self) -> &'static str { "dots" }
        fn spawn<R: Rng>(&self, index: usize, field: &FormationField, rng: &mut R) -> Agent<usize> {
            let formation = field.sample(rng, Placement::Volume);
            Agent::at_chaos(Vec3::splat(index as f32), formation, 1.0, index)
        }
    }

    fn field() -> FormationField {
        FormationField::new(22.0, 9.0).unwrap()
    }

    #[test]
    fn count_is_exact() {
        let mut rng = StdRng::seed_from_u64(1);
        let pool = AgentPool::create(Dots, 37, &field(), &mut rng).unwrap();
        assert_eq!(pool.iter().unwrap().count(), 37);
        assert_eq!(pool.len(), 37);
    }

    #[test]
    fn zero_count_rejected() {
        let err = AgentPool::new(Dots, 0).unwrap_err();
        assert_eq!(err, PoolError::ZeroCount { pool: "dots" });
    }

    #[test]
    fn traversal_before_populate_fails() {
        let pool = AgentPool::new(Dots, 4).unwrap();
        assert!(!pool.is_populated());
        assert_eq!(
            pool.for_each(|_, _| {}).unwrap_err(),
            PoolError::InvalidPoolState { pool: "dots" }
        );
    }

    #[test]
    fn for_each_visits_in_creation_order() {
        let mut rng = StdRng::seed_from_u64(2);
        let pool = AgentPool::create(Dots, 10, &field(), &mut rng).unwrap();
        let mut seen = Vec::new();
        pool.for_each(|i, a| {
            assert_eq!(i, a.params);
            seen.push(i);
        }).unwrap();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn agents_start_at_chaos() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = AgentPool::create(Dots, 5, &field(), &mut rng).unwrap();
        for a in pool.iter().unwrap() {
            assert_eq!(a.position, a.chaos);
        }
    }

    #[test]
    fn rebuild_changes_cardinality() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut pool = AgentPool::create(Dots, 5, &field(), &mut rng).unwrap();
        pool.rebuild(12, &field(), &mut rng).unwrap();
        assert_eq!(pool.iter().unwrap().count(), 12);
        assert!(pool.rebuild(0, &field(), &mut rng).is_err());
        assert_eq!(pool.len(), 12);
    }
}
