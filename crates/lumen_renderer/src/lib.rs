//! Lumen renderer - progressive CPU path tracing
//!
//! Traces camera rays through a [`lumen_core::Scene`] with one of five
//! shaders and accumulates one sample per pixel per call, so callers can
//! display or save the image between passes.

mod config;
mod integrator;
mod renderer;
mod shader;
mod shading;

pub use config::{RenderError, RenderResult, ShaderType, TraceParams};
pub use integrator::RaytraceShader;
pub use renderer::{
    clamp_radiance, init_state, render, trace_samples, trace_samples_with_stop, Pixel, RenderState,
};
pub use shader::{ColorShader, EyelightShader, NormalShader, Shader, SurfacePoint, TexcoordShader};
pub use shading::{
    eta_to_reflectivity, fresnel_schlick, fresnel_schlick1, ggx_d, reflect, sample_ggx,
    sample_hemisphere_cos, schlick_weight, smith_g_ggx,
};
