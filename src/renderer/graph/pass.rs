//! Generic pass execution
//!
//! Every stage issues its work through [`run_pass`]: one function for all
//! kernels, so the bind → dispatch → unbind discipline and the hazard checks
//! live in exactly one place.

use crate::errors::{RenderError, Result};
use crate::renderer::core::{GpuDispatch, PassDesc};

/// Validates, binds, dispatches and unbinds one pass.
///
/// The group count is derived from the first read-write view's extent and
/// the kernel's tile size. Views are unbound even when the dispatch fails.
pub fn run_pass<D: GpuDispatch + ?Sized>(dispatch: &mut D, pass: &PassDesc<'_>) -> Result<()> {
    if !dispatch.kernel_ready(pass.kernel) {
        return Err(RenderError::KernelNotInitialized(pass.kernel.name()));
    }
    pass.check_hazards()?;

    let output = pass
        .read_writes
        .first()
        .ok_or(RenderError::MissingOutput(pass.kernel.name()))?;
    let (width, height) = dispatch
        .view_extent(*output)
        .ok_or_else(|| RenderError::UnknownTarget(format!("{output:?}")))?;
    let groups = pass.kernel.group_count(width, height);

    let result = dispatch
        .bind_reads(&pass.reads)
        .and_then(|()| dispatch.bind_read_writes(&pass.read_writes))
        .and_then(|()| dispatch.dispatch(pass, groups));
    dispatch.unbind_all();
    result
}
