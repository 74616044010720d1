use rtrb::{Consumer, Producer, RingBuffer};

/// Lock-free SPSC byte buffer bridging the device callback (producer) and
/// the capture loop's blocking reads (consumer).
pub struct ByteRingBuffer {
    producer: Producer<u8>,
    consumer: Consumer<u8>,
}

pub struct ByteProducer {
    inner: Producer<u8>,
}

pub struct ByteConsumer {
    inner: Consumer<u8>,
}

impl ByteRingBuffer {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self { producer, consumer }
    }

    pub fn split(self) -> (ByteProducer, ByteConsumer) {
        (
            ByteProducer {
                inner: self.producer,
            },
            ByteConsumer {
                inner: self.consumer,
            },
        )
    }
}

impl ByteProducer {
    /// Writes as many bytes as currently fit and returns the count.
    /// A short write means the consumer has fallen behind; the caller
    /// decides whether that matters.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.inner.slots());
        if n == 0 {
            return 0;
        }
        match self.inner.write_chunk_uninit(n) {
            Ok(chunk) => chunk.fill_from_iter(data.iter().copied()),
            Err(_) => 0,
        }
    }

    pub fn slots(&self) -> usize {
        self.inner.slots()
    }
}

impl ByteConsumer {
    /// Reads up to `buf.len()` bytes; returns 0 when nothing is buffered.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.inner.slots());
        if n == 0 {
            return 0;
        }
        match self.inner.read_chunk(n) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                buf[..first.len()].copy_from_slice(first);
                buf[first.len()..first.len() + second.len()].copy_from_slice(second);
                chunk.commit_all();
                n
            }
            Err(_) => 0,
        }
    }

    pub fn slots(&self) -> usize {
        self.inner.slots()
    }
}
