//! GPU Dispatch Capability
//!
//! The narrow interface the compositor drives. A backend owns target storage
//! and compiled kernels; the compositor only ever:
//!
//! 1. creates / releases targets,
//! 2. initializes each kernel once,
//! 3. per pass: binds read views, binds read-write views, dispatches a 3-D
//!    group count, unbinds everything.
//!
//! Dispatches execute in issue order. A pass's outputs are visible to every
//! later pass without explicit barriers.

use super::binding::PassDesc;
use super::kernel::Kernel;
use super::target::{TargetDesc, TargetId, TargetView};
use crate::errors::Result;

pub trait GpuDispatch {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    fn create_target(&mut self, desc: &TargetDesc) -> Result<TargetId>;

    /// Frees a target. Unknown ids are ignored.
    fn release_target(&mut self, id: TargetId);

    fn target_desc(&self, id: TargetId) -> Option<&TargetDesc>;

    /// Compiles `kernel`. A second call for the same kernel fails with
    /// [`RenderError::KernelAlreadyInitialized`](crate::RenderError::KernelAlreadyInitialized).
    fn init_kernel(&mut self, kernel: Kernel) -> Result<()>;

    fn kernel_ready(&self, kernel: Kernel) -> bool;

    fn bind_reads(&mut self, views: &[TargetView]) -> Result<()>;

    fn bind_read_writes(&mut self, views: &[TargetView]) -> Result<()>;

    /// Runs `pass.kernel` over `groups` thread groups with the currently
    /// bound views.
    fn dispatch(&mut self, pass: &PassDesc<'_>, groups: [u32; 3]) -> Result<()>;

    fn unbind_all(&mut self);

    /// Largest value of `channel` across the view, when the backend can read
    /// results back synchronously.
    fn read_max(&mut self, view: TargetView, channel: usize) -> Option<f32> {
        let _ = (view, channel);
        None
    }

    /// Flushes recorded work. Called once at the end of every frame.
    fn submit(&mut self) -> Result<()> {
        Ok(())
    }

    /// Extent of the first mip the view covers.
    fn view_extent(&self, view: TargetView) -> Option<(u32, u32)> {
        let desc = self.target_desc(view.id)?;
        let mip = view.base_mip();
        (mip < desc.mip_levels).then(|| desc.mip_extent(mip))
    }
}
