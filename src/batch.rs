//! Field-scoped batch extraction to CSV files.

pub mod pdm;
pub mod planned;
pub mod ssdl;

/// File name stem for a wellbore: `/` and spaces become underscores.
pub fn file_safe_name(name: &str) -> String {
    name.replace(['/', ' '], "_")
}

/// File name stem used for subsurface model files, which drop the `NO ` country prefix.
pub fn rms_name(name: &str) -> String {
    file_safe_name(&name.replace("NO ", ""))
}
