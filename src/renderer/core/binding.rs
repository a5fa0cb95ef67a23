//! Pass Bindings
//!
//! A [`PassDesc`] is everything one dispatch needs: the kernel, the views it
//! reads, the views it reads and writes, and its uniform block. Each kernel
//! documents its binding order in the stage module that builds its
//! descriptor; backends consume the lists positionally.

use smallvec::SmallVec;

use super::kernel::{Kernel, LevelTag};
use super::target::TargetView;
use super::uniforms::PassParams;
use crate::errors::{RenderError, Result};

pub type ViewList = SmallVec<[TargetView; 8]>;

#[derive(Debug, Clone)]
pub struct PassDesc<'a> {
    pub kernel: Kernel,
    /// Level the pass runs for; `None` for frame-wide passes.
    pub level: Option<LevelTag>,
    pub reads: ViewList,
    pub read_writes: ViewList,
    pub params: PassParams<'a>,
}

impl<'a> PassDesc<'a> {
    #[must_use]
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            level: None,
            reads: SmallVec::new(),
            read_writes: SmallVec::new(),
            params: PassParams::None,
        }
    }

    #[must_use]
    pub fn level(mut self, tag: LevelTag) -> Self {
        self.level = Some(tag);
        self
    }

    #[must_use]
    pub fn read(mut self, view: impl Into<TargetView>) -> Self {
        self.reads.push(view.into());
        self
    }

    #[must_use]
    pub fn write(mut self, view: impl Into<TargetView>) -> Self {
        self.read_writes.push(view.into());
        self
    }

    #[must_use]
    pub fn params(mut self, params: PassParams<'a>) -> Self {
        self.params = params;
        self
    }

    /// Rejects descriptors that would bind one subresource in both roles, or
    /// the same write target twice.
    pub fn check_hazards(&self) -> Result<()> {
        for (i, write) in self.read_writes.iter().enumerate() {
            let aliased_read = self.reads.iter().any(|r| r.overlaps(write));
            let aliased_write = self.read_writes[i + 1..].iter().any(|w| w.overlaps(write));
            if aliased_read || aliased_write {
                return Err(RenderError::BindingHazard {
                    pass: self.kernel.name(),
                    target: format!("{write:?}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::core::TargetId;
    use slotmap::SlotMap;

    fn ids() -> (TargetId, TargetId) {
        let mut map: SlotMap<TargetId, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    #[test]
    fn read_and_write_of_same_target_is_a_hazard() {
        let (a, b) = ids();
        let pass = PassDesc::new(Kernel::ShadeLight).read(a).write(a);
        assert!(matches!(pass.check_hazards(), Err(RenderError::BindingHazard { .. })));
        assert!(PassDesc::new(Kernel::ShadeLight).read(a).write(b).check_hazards().is_ok());
    }

    #[test]
    fn distinct_mips_of_one_target_are_not_a_hazard() {
        let (a, _) = ids();
        let pass = PassDesc::new(Kernel::GenerateMip)
            .read(TargetView::mip(a, 0))
            .write(TargetView::mip(a, 1));
        assert!(pass.check_hazards().is_ok());

        let pass = PassDesc::new(Kernel::GenerateMip)
            .read(TargetView::whole(a))
            .write(TargetView::mip(a, 1));
        assert!(pass.check_hazards().is_err());
    }

    #[test]
    fn duplicate_write_is_a_hazard() {
        let (a, _) = ids();
        let pass = PassDesc::new(Kernel::ClearHits).write(a).write(a);
        assert!(pass.check_hazards().is_err());
    }
}
