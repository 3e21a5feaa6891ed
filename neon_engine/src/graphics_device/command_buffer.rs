/// CommandBuffer - scoped one-shot recording handle
///
/// Records uploads into the shared vertex and index buffers, then submits
/// and waits. Dropping an unsubmitted command buffer discards it.

use crate::error::{Error, Result};
use crate::graphics_device::{BufferHandle, CommandBufferHandle, GraphicsDevice};

/// A device buffer together with its size in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedBuffer {
    pub handle: BufferHandle,
    pub size: u64,
}

pub struct CommandBuffer<'a> {
    device: &'a mut dyn GraphicsDevice,
    commands: Option<CommandBufferHandle>,
    vertex_buffer: Option<SharedBuffer>,
    index_buffer: Option<SharedBuffer>,
}

impl<'a> CommandBuffer<'a> {
    /// Begin recording on `device`
    ///
    /// Buffers left as `None` reject uploads.
    pub fn begin(
        device: &'a mut dyn GraphicsDevice,
        vertex_buffer: Option<SharedBuffer>,
        index_buffer: Option<SharedBuffer>,
    ) -> Result<Self> {
        let commands = device.begin_commands()?;
        Ok(Self {
            device,
            commands: Some(commands),
            vertex_buffer,
            index_buffer,
        })
    }

    /// Upload raw vertex bytes at byte `offset` of the shared vertex buffer
    pub fn upload_vertices(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let target = self.vertex_buffer.ok_or_else(|| {
            Error::InvalidResource("no vertex buffer to upload into".to_string())
        })?;
        self.upload(target, "vertex", offset, data)
    }

    /// Upload indices starting at index `first` of the shared index buffer
    pub fn upload_indices(&mut self, first: u64, indices: &[u32]) -> Result<()> {
        let target = self.index_buffer.ok_or_else(|| {
            Error::InvalidResource("no index buffer to upload into".to_string())
        })?;
        let offset = first * std::mem::size_of::<u32>() as u64;
        self.upload(target, "index", offset, bytemuck::cast_slice(indices))
    }

    /// Submit the recorded commands and wait for completion
    pub fn submit(mut self) -> Result<()> {
        match self.commands.take() {
            Some(commands) => self.device.submit_and_wait(commands),
            None => Err(Error::InvalidResource("command buffer already consumed".to_string())),
        }
    }

    fn upload(&mut self, target: SharedBuffer, kind: &str, offset: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > target.size) {
            return Err(Error::InvalidResource(format!(
                "{} upload of {} bytes at offset {} exceeds buffer size {}",
                kind,
                data.len(),
                offset,
                target.size
            )));
        }

        let commands = self.commands.ok_or_else(|| {
            Error::InvalidResource("command buffer already consumed".to_string())
        })?;
        self.device.cmd_upload_buffer(commands, target.handle, offset, data)
    }
}

impl Drop for CommandBuffer<'_> {
    fn drop(&mut self) {
        if let Some(commands) = self.commands.take() {
            self.device.discard_commands(commands);
        }
    }
}

#[cfg(test)]
#[path = "command_buffer_tests.rs"]
mod tests;
