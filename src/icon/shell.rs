//! Icon source backed by the Windows shell.
//!
//! Default icons come from `SHGetFileInfoW`, so `.exe`, `.lnk` and folders
//! look the way Explorer shows them. Overrides pointing into a module
//! (`shell32.dll,4`) are read with `ExtractIconExW`; overrides naming an
//! image file are decoded by [`ImageIconSource`].
//!
//! Every `HICON` is turned into pixels by reading its color and mask planes
//! with `GetDIBits`. Icons without an alpha channel take their transparency
//! from the mask.

use image::RgbaImage;

/// Icons larger than this are requested in the shell's large size.
#[cfg_attr(not(windows), allow(dead_code))]
const SMALL_ICON_SIZE: u32 = 16;

/// Merge BGRA icon planes into straight RGBA.
///
/// `color` is the 32 bpp color plane, or `None` for monochrome icons, whose
/// `mask` holds the AND plane followed by the XOR plane. When the color
/// plane carries no alpha at all, the AND plane decides transparency.
/// Returns `None` if a plane is shorter than the geometry needs.
#[cfg_attr(not(windows), allow(dead_code))]
fn merge_planes(color: Option<&[u8]>, mask: &[u8], width: u32, height: u32) -> Option<RgbaImage> {
    let len = (width as usize).checked_mul(height as usize)?.checked_mul(4)?;
    let and_plane = mask.get(..len)?;
    let xor_plane = match color {
        Some(color) => color.get(..len)?,
        None => mask.get(len..len.checked_mul(2)?)?,
    };
    let has_alpha = color.is_some() && xor_plane.chunks_exact(4).any(|px| px[3] != 0);

    let mut rgba = Vec::with_capacity(len);
    for (px, and) in xor_plane.chunks_exact(4).zip(and_plane.chunks_exact(4)) {
        let alpha = match (has_alpha, and[0]) {
            (true, _) => px[3],
            (false, 0) => 255,
            (false, _) => 0,
        };
        rgba.extend_from_slice(&[px[2], px[1], px[0], alpha]);
    }
    RgbaImage::from_raw(width, height, rgba)
}

#[cfg(windows)]
pub use windows_shell::ShellIconSource;

#[cfg(windows)]
mod windows_shell {
    use std::mem::size_of;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;

    use image::RgbaImage;
    use windows::core::{HRESULT, PCWSTR};
    use windows::Win32::Graphics::Gdi::{
        CreateCompatibleDC, DeleteDC, DeleteObject, GetDIBits, GetObjectW, BITMAP, BITMAPINFO,
        BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ,
    };
    use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};
    use windows::Win32::UI::Shell::{SHFILEINFOW, SHGFI_ICON, SHGFI_LARGEICON, SHGFI_SMALLICON};
    use windows::Win32::UI::WindowsAndMessaging::{DestroyIcon, GetIconInfo, HICON, ICONINFO};

    use super::{merge_planes, SMALL_ICON_SIZE};
    use crate::icon::override_file::IconLocation;
    use crate::icon::source::{is_image_path, ImageIconSource};
    use crate::icon::{EntryKind, ExtractError, IconSource};

    #[link(name = "shell32")]
    extern "system" {
        fn SHGetFileInfoW(
            psz_path: PCWSTR,
            file_attributes: u32,
            psfi: *mut SHFILEINFOW,
            cb_file_info: u32,
            flags: u32,
        ) -> usize;

        fn ExtractIconExW(
            file: PCWSTR,
            icon_index: i32,
            large: *mut HICON,
            small: *mut HICON,
            icons: u32,
        ) -> u32;
    }

    /// Icon source asking the shell, the way Explorer draws items.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct ShellIconSource;

    impl ShellIconSource {
        /// Create the source.
        #[must_use]
        pub fn new() -> Self {
            Self
        }
    }

    impl IconSource for ShellIconSource {
        fn load_location(&self, location: &IconLocation, size: u32) -> Result<RgbaImage, ExtractError> {
            if is_image_path(&location.path) {
                return ImageIconSource::new().load_location(location, size);
            }
            module_icon(&location.path, location.index, size)
        }

        fn default_icon(&self, path: &Path, _kind: EntryKind, size: u32) -> Result<RgbaImage, ExtractError> {
            file_icon(path, size)
        }
    }

    /// COM stays initialized for the guard's lifetime.
    struct ComInit(HRESULT);

    impl ComInit {
        fn new() -> Self {
            // SAFETY: no reserved pointer is passed; a failed call is never
            // balanced with CoUninitialize.
            Self(unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) })
        }
    }

    impl Drop for ComInit {
        fn drop(&mut self) {
            if self.0.is_ok() {
                // SAFETY: paired with the successful CoInitializeEx above.
                unsafe { CoUninitialize() };
            }
        }
    }

    struct OwnedIcon(HICON);

    impl Drop for OwnedIcon {
        fn drop(&mut self) {
            if !self.0.is_invalid() {
                // SAFETY: the icon was created for us and is destroyed once.
                let _ = unsafe { DestroyIcon(self.0) };
            }
        }
    }

    struct OwnedBitmap(HBITMAP);

    impl Drop for OwnedBitmap {
        fn drop(&mut self) {
            if !self.0.is_invalid() {
                // SAFETY: GetIconInfo hands ownership of its bitmaps to the caller.
                let _ = unsafe { DeleteObject(HGDIOBJ(self.0 .0)) };
            }
        }
    }

    struct MemoryDc(HDC);

    impl Drop for MemoryDc {
        fn drop(&mut self) {
            // SAFETY: created by CreateCompatibleDC and deleted once.
            let _ = unsafe { DeleteDC(self.0) };
        }
    }

    fn wide(path: &Path) -> Vec<u16> {
        path.as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    fn shell_error(path: &Path, reason: impl Into<String>) -> ExtractError {
        ExtractError::Shell {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// The icon Explorer shows for `path`.
    fn file_icon(path: &Path, size: u32) -> Result<RgbaImage, ExtractError> {
        let _com = ComInit::new();
        let wide_path = wide(path);
        let mut info = SHFILEINFOW::default();
        let flags = SHGFI_ICON.0
            | if size > SMALL_ICON_SIZE {
                SHGFI_LARGEICON.0
            } else {
                SHGFI_SMALLICON.0
            };

        // SAFETY: `wide_path` is null-terminated and outlives the call;
        // `info` is a valid SHFILEINFOW of the size passed.
        let found = unsafe {
            SHGetFileInfoW(
                PCWSTR(wide_path.as_ptr()),
                0,
                &mut info,
                size_of::<SHFILEINFOW>() as u32,
                flags,
            )
        };
        let icon = OwnedIcon(info.hIcon);
        if found == 0 || icon.0.is_invalid() {
            return Err(shell_error(path, "the shell has no icon for it"));
        }
        icon_pixels(&icon).map_err(|reason| shell_error(path, reason))
    }

    /// Icon number `index` of a module or icon file.
    fn module_icon(path: &Path, index: i32, size: u32) -> Result<RgbaImage, ExtractError> {
        let wide_path = wide(path);
        let mut large = HICON::default();
        let mut small = HICON::default();

        // SAFETY: `wide_path` is null-terminated; both out pointers are valid
        // for one HICON each, matching the requested count.
        let extracted = unsafe {
            ExtractIconExW(PCWSTR(wide_path.as_ptr()), index, &mut large, &mut small, 1)
        };
        let (large, small) = (OwnedIcon(large), OwnedIcon(small));
        if extracted == 0 || extracted == u32::MAX {
            return Err(shell_error(path, format!("no icon at index {index}")));
        }

        let (preferred, other) = if size > SMALL_ICON_SIZE {
            (&large, &small)
        } else {
            (&small, &large)
        };
        let icon = [preferred, other]
            .into_iter()
            .find(|icon| !icon.0.is_invalid())
            .ok_or_else(|| shell_error(path, format!("no icon at index {index}")))?;
        icon_pixels(icon).map_err(|reason| shell_error(path, reason))
    }

    /// Read both planes of an icon and merge them.
    fn icon_pixels(icon: &OwnedIcon) -> Result<RgbaImage, String> {
        let mut info = ICONINFO::default();
        // SAFETY: `icon` is a live HICON and `info` a valid out pointer.
        unsafe { GetIconInfo(icon.0, &mut info) }.map_err(|e| e.to_string())?;
        let mask = OwnedBitmap(info.hbmMask);
        let color = OwnedBitmap(info.hbmColor);
        let monochrome = color.0.is_invalid();

        let mut header = BITMAP::default();
        let measured = if monochrome { &mask } else { &color };
        // SAFETY: `header` is a BITMAP of the size passed.
        let written = unsafe {
            GetObjectW(
                HGDIOBJ(measured.0 .0),
                size_of::<BITMAP>() as i32,
                Some((&mut header as *mut BITMAP).cast()),
            )
        };
        if written == 0 {
            return Err("cannot measure the icon bitmap".to_string());
        }

        let width = header.bmWidth;
        let height = if monochrome {
            header.bmHeight / 2
        } else {
            header.bmHeight
        };
        if width <= 0 || height <= 0 {
            return Err(format!("icon has no pixels ({width}x{height})"));
        }

        // SAFETY: a null DC asks for one compatible with the screen.
        let dc = MemoryDc(unsafe { CreateCompatibleDC(HDC::default()) });
        if dc.0.is_invalid() {
            return Err("cannot create a memory device context".to_string());
        }

        let color_bits = if monochrome {
            None
        } else {
            Some(read_bits(&dc, &color, width, height).ok_or("cannot read the color plane")?)
        };
        let mask_height = if monochrome { height * 2 } else { height };
        let mask_bits =
            read_bits(&dc, &mask, width, mask_height).ok_or("cannot read the mask plane")?;

        merge_planes(
            color_bits.as_deref(),
            &mask_bits,
            width.unsigned_abs(),
            height.unsigned_abs(),
        )
        .ok_or_else(|| "icon planes do not match their size".to_string())
    }

    /// Copy a bitmap out as top-down 32 bpp BGRA.
    fn read_bits(dc: &MemoryDc, bitmap: &OwnedBitmap, width: i32, height: i32) -> Option<Vec<u8>> {
        let mut info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut bits = vec![0u8; width as usize * height as usize * 4];

        // SAFETY: `bits` holds `height` rows of `width` 32 bpp pixels as
        // described by `info`; the bitmap is not selected into any DC.
        let lines = unsafe {
            GetDIBits(
                dc.0,
                bitmap.0,
                0,
                height as u32,
                Some(bits.as_mut_ptr().cast()),
                &mut info,
                DIB_RGB_COLORS,
            )
        };
        (lines == height).then_some(bits)
    }
}
