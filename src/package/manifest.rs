//! Reads application identity out of a package manifest (`AppxManifest.xml`).
//!
//! Display name lookup order:
//! 1. the first foundation-namespace `<DisplayName>` element
//! 2. the `DisplayName` attribute of `<uap:VisualElements>`
//! 3. the package's own display name property
//!
//! The icon is `Square150x150Logo`, else `Square44x44Logo`, and only counts
//! if the referenced file exists inside the install root.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use tracing::debug;

use super::PackageInfo;
use crate::config::InstallerConfig;
use crate::error::{Result, ShortcutError};

pub const FOUNDATION_NS: &[u8] = b"http://schemas.microsoft.com/appx/manifest/foundation/windows10";
pub const UAP_NS: &[u8] = b"http://schemas.microsoft.com/appx/manifest/uap/windows10";

/// Identity of the packaged app, derived fresh on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub display_name: String,
    pub application_id: String,
    pub package_family_name: String,
    pub icon_path: Option<PathBuf>,
}

/// Raw values pulled from the manifest, before fallbacks are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestFields {
    pub display_name: Option<String>,
    pub visual_display_name: Option<String>,
    pub application_id: Option<String>,
    pub square150_logo: Option<String>,
    pub square44_logo: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ManifestResolver {
    manifest_file: String,
    default_application_id: String,
}

impl ManifestResolver {
    pub fn new(manifest_file: impl Into<String>, default_application_id: impl Into<String>) -> Self {
        Self {
            manifest_file: manifest_file.into(),
            default_application_id: default_application_id.into(),
        }
    }

    pub fn from_config(config: &InstallerConfig) -> Self {
        Self::new(&config.manifest_file, &config.default_application_id)
    }

    pub fn manifest_path(&self, package: &PackageInfo) -> PathBuf {
        package.install_root.join(&self.manifest_file)
    }

    /// Reads and parses the manifest of `package`. Fails as a whole when the
    /// manifest is missing or malformed.
    pub fn resolve(&self, package: &PackageInfo) -> Result<AppIdentity> {
        let path = self.manifest_path(package);
        let content = fs::read_to_string(&path)
            .map_err(|e| ShortcutError::io("read manifest", &path, e))?;
        let fields = parse_manifest(&content)?;
        self.identity_from(fields, package)
    }

    /// Applies the fallback chain to already parsed fields.
    pub fn identity_from(&self, fields: ManifestFields, package: &PackageInfo) -> Result<AppIdentity> {
        let display_name = fields
            .display_name
            .or(fields.visual_display_name)
            .or_else(|| non_blank(&package.display_name))
            .ok_or_else(|| ShortcutError::Identity("no display name in manifest or package".to_string()))?;

        let package_family_name = non_blank(&package.family_name)
            .ok_or_else(|| ShortcutError::Identity("empty package family name".to_string()))?;

        let application_id = fields
            .application_id
            .unwrap_or_else(|| self.default_application_id.clone());

        let icon_path = fields
            .square150_logo
            .or(fields.square44_logo)
            .and_then(|logo| {
                let resolved = resolve_asset(&package.install_root, &logo);
                if resolved.is_none() {
                    debug!("Logo '{}' not found in package, continuing without icon", logo);
                }
                resolved
            });

        Ok(AppIdentity {
            display_name,
            application_id,
            package_family_name,
            icon_path,
        })
    }
}

/// Locates a manifest asset reference (either slash style) under `install_root`.
/// References that leave the install root resolve to nothing.
pub fn resolve_asset(install_root: &Path, reference: &str) -> Option<PathBuf> {
    if reference.starts_with(['/', '\\']) {
        return None;
    }

    let mut path = install_root.to_path_buf();
    let mut pushed = false;
    for part in reference.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => return None,
            p if p.contains(':') => return None,
            p => {
                path.push(p);
                pushed = true;
            }
        }
    }

    (pushed && path.is_file()).then_some(path)
}

/// Extracts the identity-related fields from manifest XML.
pub fn parse_manifest(xml: &str) -> Result<ManifestFields> {
    let mut reader = NsReader::from_str(xml);
    let mut scan = ManifestScan::default();

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        let ns = bound_namespace(&ns);

        match event {
            Event::Start(e) => {
                scan.depth += 1;
                scan.seen_root = true;
                scan.observe(ns, &e, true)?;
            }
            Event::Empty(e) => {
                scan.seen_root = true;
                scan.observe(ns, &e, false)?;
            }
            Event::End(_) => {
                if scan.capture.as_ref().is_some_and(|(level, _)| *level == scan.depth) {
                    if let Some((_, text)) = scan.capture.take() {
                        scan.fields.display_name = non_blank(&text);
                    }
                }
                scan.depth = scan
                    .depth
                    .checked_sub(1)
                    .ok_or_else(|| ShortcutError::MalformedManifest("unbalanced end tag".to_string()))?;
            }
            Event::Text(t) => {
                if let Some((_, text)) = scan.capture.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = scan.capture.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !scan.seen_root {
        return Err(ShortcutError::MalformedManifest("no root element".to_string()));
    }
    if scan.depth != 0 {
        return Err(ShortcutError::MalformedManifest("unexpected end of document".to_string()));
    }
    Ok(scan.fields)
}

#[derive(Default)]
struct ManifestScan {
    fields: ManifestFields,
    depth: usize,
    seen_root: bool,
    seen_display_name: bool,
    seen_application: bool,
    seen_visual_elements: bool,
    // Depth of the open <DisplayName> element and the text gathered so far.
    capture: Option<(usize, String)>,
}

impl ManifestScan {
    fn observe(&mut self, ns: Option<&[u8]>, e: &BytesStart<'_>, has_content: bool) -> Result<()> {
        let local = e.local_name();
        match (ns, local.as_ref()) {
            (Some(uri), b"DisplayName") if uri == FOUNDATION_NS && !self.seen_display_name => {
                self.seen_display_name = true;
                if has_content {
                    self.capture = Some((self.depth, String::new()));
                }
            }
            (Some(uri), b"Application") if uri == FOUNDATION_NS && !self.seen_application => {
                self.seen_application = true;
                self.fields.application_id = attribute(e, b"Id")?.and_then(|v| non_blank(&v));
            }
            (Some(uri), b"VisualElements") if uri == UAP_NS && !self.seen_visual_elements => {
                self.seen_visual_elements = true;
                self.fields.visual_display_name = attribute(e, b"DisplayName")?.and_then(|v| non_blank(&v));
                self.fields.square150_logo = attribute(e, b"Square150x150Logo")?.and_then(|v| non_blank(&v));
                self.fields.square44_logo = attribute(e, b"Square44x44Logo")?.and_then(|v| non_blank(&v));
            }
            _ => {}
        }
        Ok(())
    }
}

fn bound_namespace<'a>(ns: &'a ResolveResult<'_>) -> Option<&'a [u8]> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(*uri),
        _ => None,
    }
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.prefix().is_none() && attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
