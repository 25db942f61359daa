//! Copy-to-clipboard affordance for elements marked with the `copy` class.

use crate::confirmation::{CONFIRMATION_DELAY, COPIED_MESSAGE, COPY_FAILED_MESSAGE};
use crate::{ConsentError, Confirmations};

/// Marker class of copyable elements.
pub const COPY_CLASS: &str = "copy";

/// The platform clipboard-write capability.
pub trait ClipboardWriter {
    fn write_text(&mut self, text: &str) -> Result<(), String>;
}

/// Manual copy through a temporary editable field and the document's copy command.
pub trait SelectionHost {
    type Field;

    /// Creates an off-screen editable field holding `text` and attaches it.
    fn create_field(&mut self, text: &str) -> Result<Self::Field, String>;
    /// Focuses `field` and selects its whole content.
    fn select(&mut self, field: &Self::Field) -> Result<(), String>;
    /// Issues the copy command; `false` when the command was refused.
    fn exec_copy(&mut self) -> bool;
    fn clear_selection(&mut self);
    fn remove_field(&mut self, field: Self::Field);
}

/// Which mechanism ended up holding the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    Clipboard,
    Selection,
}

/// A clicked copy-marked element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTarget {
    pub id: String,
    pub text: String,
}

impl CopyTarget {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

// Temporary field, detached from the host on every exit path.
struct TempField<'a, H: SelectionHost> {
    host: &'a mut H,
    field: Option<H::Field>,
}

impl<H: SelectionHost> TempField<'_, H> {
    fn select(&mut self) -> Result<(), String> {
        match &self.field {
            Some(field) => self.host.select(field),
            None => Ok(()),
        }
    }

    fn copy(&mut self) -> Result<(), String> {
        if self.host.exec_copy() {
            Ok(())
        } else {
            Err("copy command was refused".to_string())
        }
    }
}

impl<H: SelectionHost> Drop for TempField<'_, H> {
    fn drop(&mut self) {
        if let Some(field) = self.field.take() {
            self.host.clear_selection();
            self.host.remove_field(field);
        }
    }
}

fn selection_copy<H: SelectionHost>(host: &mut H, text: &str) -> Result<(), String> {
    let field = host.create_field(text)?;
    let mut temp = TempField {
        host,
        field: Some(field),
    };
    temp.select()?;
    temp.copy()
}

/// Copies `text`, preferring the clipboard and falling back to a selection copy.
///
/// `clipboard` is `None` when the platform has no clipboard-write capability.
/// Fails only when both mechanisms fail.
pub fn copy_text<C, H>(
    clipboard: Option<&mut C>,
    host: &mut H,
    text: &str,
) -> Result<CopyMethod, ConsentError>
where
    C: ClipboardWriter,
    H: SelectionHost,
{
    let primary = match clipboard {
        Some(clipboard) => match clipboard.write_text(text) {
            Ok(()) => return Ok(CopyMethod::Clipboard),
            Err(err) => {
                tracing::debug!(%err, "clipboard write failed, trying selection copy");
                Some(err)
            }
        },
        None => None,
    };

    selection_copy(host, text)
        .map(|()| CopyMethod::Selection)
        .map_err(|fallback| ConsentError::Clipboard { primary, fallback })
}

/// Click handler of a copy target: copies its text and shows a confirmation
/// next to it.
///
/// Confirmations need a Tokio runtime. Without one a successful copy still
/// returns [`ConsentError::Timer`].
pub fn copy_target<C, H>(
    target: &CopyTarget,
    clipboard: Option<&mut C>,
    host: &mut H,
    confirmations: &Confirmations,
) -> Result<CopyMethod, ConsentError>
where
    C: ClipboardWriter,
    H: SelectionHost,
{
    match copy_text(clipboard, host, &target.text) {
        Ok(method) => {
            confirmations.show(target.id.as_str(), COPIED_MESSAGE, CONFIRMATION_DELAY)?;
            Ok(method)
        }
        Err(err) => {
            tracing::warn!(%err, target = %target.id, "copy failed");
            if let Err(timer) =
                confirmations.show(target.id.as_str(), COPY_FAILED_MESSAGE, CONFIRMATION_DELAY)
            {
                tracing::warn!(%timer, "copy failure not shown");
            }
            Err(err)
        }
    }
}
