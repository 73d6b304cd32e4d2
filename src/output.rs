//! Assembly of the two output streams.
use crate::chunk::ChunkKind;

/// Collects processed segments into the trimmed stream (`code`) and the
/// verbatim stream (`code_all`).
///
/// Blank lines and comments are not flushed immediately. They are held back
/// and attached to the next emitted code segment, so a comment documenting a
/// piece of code travels with it, and a comment above a segment that never
/// gets emitted disappears along with it.
#[derive(Default,Debug)]
pub struct Output {
	last_space: String,
	last_comment: String,
	non_empty: bool,
	pub code: String,
	pub code_all: String,
}

impl Output {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// Append one processed segment.
	///
	/// `suppressed` marks segments seen inside an inactive conditional
	/// branch: they reach only the verbatim stream, and for the trimmed
	/// stream they behave like directives (pending attachments are cleared).
	pub fn push(&mut self, part: &str, kind: ChunkKind, suppressed: bool) {
		self.code_all.push_str(part);
		self.code_all.push('\n');
		if suppressed {
			self.last_space.clear();
			self.last_comment.clear();
			return;
		}
		match kind {
			ChunkKind::Space => {
				// Leading blank lines are dropped, not attached.
				if self.non_empty {
					self.last_space = format!("{part}\n");
				}
				self.last_comment.clear();
			}
			ChunkKind::Comment => {
				self.last_comment.push_str(part);
				self.last_comment.push('\n');
			}
			ChunkKind::Directive => {
				self.last_space.clear();
				self.last_comment.clear();
			}
			ChunkKind::Code => {
				self.code.push_str(&self.last_space);
				self.code.push_str(&self.last_comment);
				self.code.push_str(part);
				self.code.push('\n');
				self.last_space.clear();
				self.last_comment.clear();
				self.non_empty = true;
			}
		}
	}
}
