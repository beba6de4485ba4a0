//! Synthesized driver program for the line reader under test.
//!
//! The driver reads one line at a time from a descriptor (the path in
//! `argv[1]`, else descriptor 0), writes each line verbatim to stdout and
//! frees it, until the entry point returns `NULL`. It exits 0 on exhaustion
//! and 1 when the path cannot be opened.

use std::path::Path;

use crate::error::ToolchainError;

/// Default header declaring the entry point.
pub const DEFAULT_HEADER: &str = "get_next_line.h";
/// Default entry point symbol.
pub const DEFAULT_ENTRY_POINT: &str = "get_next_line";

const TEMPLATE: &str = r#"#include "@HEADER@"
#include <fcntl.h>
#include <stdio.h>
#include <stdlib.h>
#include <unistd.h>

int	main(int argc, char **argv)
{
	int		fd;
	char	*line;

	fd = 0;
	if (argc > 1)
	{
		fd = open(argv[1], O_RDONLY);
		if (fd < 0)
		{
			fprintf(stderr, "driver: cannot open %s\n", argv[1]);
			return (1);
		}
	}
	while ((line = @ENTRY@(fd)) != NULL)
	{
		fputs(line, stdout);
		free(line);
	}
	if (argc > 1)
		close(fd);
	return (0);
}
"#;

/// Renders the driver source for a given header and entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSynthesizer {
    /// Header included with quotes, resolved against the library directory.
    pub header: String,
    /// `char *entry(int fd)` symbol exported by the library.
    pub entry_point: String,
}

impl Default for DriverSynthesizer {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
        }
    }
}

impl DriverSynthesizer {
    #[must_use]
    pub fn new(header: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            entry_point: entry_point.into(),
        }
    }

    /// Deterministic program text.
    #[must_use]
    pub fn render(&self) -> String {
        TEMPLATE
            .replace("@HEADER@", &self.header)
            .replace("@ENTRY@", &self.entry_point)
    }

    /// Write the program to `path`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`ToolchainError::Io`] if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<(), ToolchainError> {
        std::fs::write(path, self.render())
            .map_err(|err| ToolchainError::io_at("write driver source", path, err))
    }
}
