//! Error Types
//!
//! This module defines the error types used throughout the compositor.
//!
//! # Overview
//!
//! The main error type [`RenderError`] covers three families of failure:
//! - **Precondition violations**: a kernel dispatched before it was initialized,
//!   a kernel initialized twice, a pass binding the same subresource for read and
//!   write, a recursion depth the render-target pool cannot hold.
//! - **Resource-creation failures**: GPU adapter/device/target/kernel creation.
//! - **Configuration errors**: invalid values or unparsable settings files.
//!
//! The core never catches its own errors. A failed dispatch fails the frame and
//! the caller decides whether to skip it or abort.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, RenderError>`.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for the compositor.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // GPU & Backend Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request GPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[cfg(feature = "gpu")]
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// A render target could not be created.
    #[error("Failed to create render target '{label}': {reason}")]
    TargetCreateFailed {
        /// Debug label of the target
        label: &'static str,
        /// Backend-provided reason
        reason: String,
    },

    /// Results could not be copied back from the device.
    #[error("GPU readback failed: {0}")]
    ReadbackFailed(String),

    /// A target id does not refer to a live target.
    #[error("Unknown render target: {0}")]
    UnknownTarget(String),

    // ========================================================================
    // Kernel Errors
    // ========================================================================
    /// Kernel source could not be read from its conventional location.
    #[error("Failed to load kernel '{kernel}' from {path}: {source}")]
    KernelLoadFailed {
        /// Kernel name
        kernel: &'static str,
        /// Path that was tried
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A kernel was dispatched before [`GpuDispatch::init_kernel`](crate::renderer::core::GpuDispatch::init_kernel).
    #[error("Kernel '{0}' used before initialization")]
    KernelNotInitialized(&'static str),

    /// A kernel was initialized a second time.
    #[error("Kernel '{0}' is already initialized")]
    KernelAlreadyInitialized(&'static str),

    // ========================================================================
    // Pass & Resource Hazards
    // ========================================================================
    /// The same subresource was bound as a read source and a write target in one pass.
    #[error("Binding hazard in pass '{pass}': target {target} is bound for read and write")]
    BindingHazard {
        /// Pass label
        pass: &'static str,
        /// Offending target
        target: String,
    },

    /// A pass bound fewer views than its kernel consumes.
    #[error("Kernel '{kernel}' expects {expected} {role} views, {found} bound")]
    BindingMismatch {
        /// Kernel name
        kernel: &'static str,
        /// "read" or "read-write"
        role: &'static str,
        /// Views the kernel consumes
        expected: usize,
        /// Views actually bound
        found: usize,
    },

    /// Uploaded texels do not cover the destination level exactly.
    #[error("Upload to {target} expects {expected} texels, got {found}")]
    UploadSizeMismatch {
        /// Destination target and mip
        target: String,
        /// Texels in the destination level
        expected: usize,
        /// Texels supplied
        found: usize,
    },

    /// A pass carried a parameter block of the wrong kind for its kernel.
    #[error("Kernel '{0}' dispatched with mismatched parameters")]
    ParamsMismatch(&'static str),

    /// A pass was issued with no write target to size the dispatch from.
    #[error("Pass '{0}' has no output target")]
    MissingOutput(&'static str),

    /// The render-target pool has no free set and no room to grow.
    #[error("Render target pool exhausted (capacity {capacity})")]
    PoolExhausted {
        /// Pool capacity in level target sets
        capacity: usize,
    },

    /// Requested recursion depth exceeds what the pool was configured for.
    #[error("Recursion depth {requested} exceeds configured maximum {supported}")]
    DepthExceedsCapacity {
        /// Requested `max_level_count`
        requested: u32,
        /// Highest depth the configuration supports
        supported: u32,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Settings file could not be parsed.
    #[error("Settings parse error: {0}")]
    SettingsParse(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
