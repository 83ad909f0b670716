//! Build script for Stacky
//!
//! - Windows: embeds the application manifest for long path support
//!   (>260 chars) so deep `.submenu` trees resolve correctly.
//!
//! On non-Windows platforms the script does nothing.

fn main() {
    #[cfg(windows)]
    {
        // The .rc file references the manifest through an RT_MANIFEST resource
        embed_resource::compile("stacky.rc", embed_resource::NONE);

        println!("cargo:rerun-if-changed=stacky.rc");
        println!("cargo:rerun-if-changed=stacky.manifest");
    }
}
