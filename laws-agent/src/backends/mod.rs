// ABOUTME: Concrete backend implementations.
// ABOUTME: claude = hosted agent runtime in stream-JSON mode, cline = local CLI subprocess.

pub mod claude;
pub mod cline;
