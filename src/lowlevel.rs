//! # Search snapshots
//!
//! The state graph explored by the inner search: immutable snapshots of the
//! stacks, the held object and the arm column. Snapshots share structure
//! through persistent vectors, so branching the frontier never copies whole
//! stacks; the object catalogue stays on the world and is borrowed back in
//! through [`Snapshot`].

use crate::world::{ObjectId, ObjectSpec, Primitive, Scene, World};

use im::Vector;
use indexmap::IndexMap;

/// One node of the low-level state graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowNode {
    pub stacks: Vector<Vector<ObjectId>>,
    pub holding: Option<ObjectId>,
    pub arm: usize,
}

impl LowNode {
    pub fn from_world(world: &World) -> LowNode {
        LowNode {
            stacks: world
                .stacks
                .iter()
                .map(|s| s.iter().cloned().collect())
                .collect(),
            holding: world.holding.clone(),
            arm: world.arm,
        }
    }

    /// The canonical id: stacks, held object and arm column joined into
    /// one string. Two nodes with the same id are the same search state.
    pub fn id(&self) -> String {
        let stacks: Vec<String> = self
            .stacks
            .iter()
            .map(|s| {
                s.iter().cloned().collect::<Vec<String>>().join(",")
            })
            .collect();
        format!(
            "{}|{}|{}",
            stacks.join(";"),
            self.holding.as_deref().unwrap_or("-"),
            self.arm
        )
    }

    /// Apply one primitive if it is legal here, yielding the next node.
    pub fn apply(
        &self,
        p: Primitive,
        world: &World,
    ) -> Option<LowNode> {
        match p {
            Primitive::Left => {
                if self.arm == 0 {
                    return None;
                }
                Some(LowNode {
                    stacks: self.stacks.clone(),
                    holding: self.holding.clone(),
                    arm: self.arm - 1,
                })
            }
            Primitive::Right => {
                if self.arm + 1 >= self.stacks.len() {
                    return None;
                }
                Some(LowNode {
                    stacks: self.stacks.clone(),
                    holding: self.holding.clone(),
                    arm: self.arm + 1,
                })
            }
            Primitive::Pick => {
                if self.holding.is_some() {
                    return None;
                }
                let mut column = self.stacks.get(self.arm)?.clone();
                let id = column.pop_back()?;
                Some(LowNode {
                    stacks: self.stacks.update(self.arm, column),
                    holding: Some(id),
                    arm: self.arm,
                })
            }
            Primitive::Drop => {
                let held = self.holding.clone()?;
                let snapshot = Snapshot { node: self, world };
                let spec = *snapshot.spec(&held)?;
                if !snapshot.accepts(self.arm, &spec) {
                    return None;
                }
                let mut column = self.stacks.get(self.arm)?.clone();
                column.push_back(held);
                Some(LowNode {
                    stacks: self.stacks.update(self.arm, column),
                    holding: None,
                    arm: self.arm,
                })
            }
        }
    }
}

/// A [`LowNode`] viewed together with its world's object catalogue.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    pub node: &'a LowNode,
    pub world: &'a World,
}

impl<'a> Scene for Snapshot<'a> {
    fn stack_count(&self) -> usize {
        self.node.stacks.len()
    }

    fn height(&self, col: usize) -> usize {
        self.node.stacks.get(col).map(|s| s.len()).unwrap_or(0)
    }

    fn item(&self, col: usize, idx: usize) -> Option<&ObjectId> {
        self.node.stacks.get(col)?.get(idx)
    }

    fn held(&self) -> Option<&ObjectId> {
        self.node.holding.as_ref()
    }

    fn arm(&self) -> usize {
        self.node.arm
    }

    fn catalogue(&self) -> &IndexMap<ObjectId, ObjectSpec> {
        &self.world.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Preset;

    #[test]
    fn ids_distinguish_states() {
        let w = Preset::named("small").unwrap().world;
        let start = LowNode::from_world(&w);
        let right = start.apply(Primitive::Right, &w).unwrap();
        let picked = start.apply(Primitive::Pick, &w).unwrap();
        assert_ne!(start.id(), right.id());
        assert_ne!(start.id(), picked.id());
        assert_eq!(
            start.id(),
            LowNode::from_world(&w).id(),
            "ids are canonical"
        );
    }

    #[test]
    fn branching_leaves_the_source_untouched() {
        let w = Preset::named("small").unwrap().world;
        let start = LowNode::from_world(&w);
        let picked = start.apply(Primitive::Pick, &w).unwrap();
        assert_eq!(start.holding, None);
        assert_eq!(picked.holding.as_deref(), Some("e"));
        assert_eq!(start.stacks.get(0).unwrap().len(), 1);
        assert_eq!(picked.stacks.get(0).unwrap().len(), 0);
    }

    #[test]
    fn drop_legality_matches_the_executor() {
        let w = Preset::named("small").unwrap().world;
        let start = LowNode::from_world(&w);
        assert!(start.apply(Primitive::Drop, &w).is_none());
        assert!(start.apply(Primitive::Left, &w).is_none());
        let held = start.apply(Primitive::Pick, &w).unwrap();
        // The white ball may not land on the black ball topping column 3.
        let at_tables = held
            .apply(Primitive::Right, &w)
            .unwrap()
            .apply(Primitive::Right, &w)
            .unwrap()
            .apply(Primitive::Right, &w)
            .unwrap();
        assert!(at_tables.apply(Primitive::Drop, &w).is_none());
    }
}
