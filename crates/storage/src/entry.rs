use timedtext_common::StoreResult;

/// Entrada no store: buffer de texto + epoch da criação que o gerou.
#[derive(Debug, Clone)]
pub struct Entry {
    buffer: String,
    epoch: u64,
}

impl Entry {
    pub fn new(buffer: String, epoch: u64) -> Self {
        Self { buffer, epoch }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Concatena `text` ao buffer. A capacidade é reservada antes da escrita,
    /// então em caso de erro o buffer fica intacto.
    pub fn append(&mut self, text: &str) -> StoreResult<()> {
        self.buffer.try_reserve(text.len())?;
        self.buffer.push_str(text);
        Ok(())
    }

    /// Troca o buffer inteiro. O epoch é mantido.
    pub fn replace(&mut self, buffer: String) {
        self.buffer = buffer;
    }
}
