//! Readers for the simulator's two inputs: the channel graph and the
//! captured message log.

mod graph;
mod messages;

pub use graph::{load_channel_graph, read_channel_graph};
pub use messages::{bucket_messages, load_message_log, read_message_log, MessageWindow};

use crate::error::LoadError;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

fn open(path: &Path) -> Result<BufReader<File>, LoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}
