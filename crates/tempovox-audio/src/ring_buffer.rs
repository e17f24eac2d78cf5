//! Lock-free sample transport between the capture callback and the pipeline.

use rtrb::{Consumer, Producer, RingBuffer};

/// SPSC ring of raw i16 samples.
pub struct SampleRing {
    producer: Producer<i16>,
    consumer: Consumer<i16>,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self { producer, consumer }
    }

    /// Split into halves for the capture thread and the processing side.
    pub fn split(self) -> (SampleProducer, SampleConsumer) {
        (
            SampleProducer {
                producer: self.producer,
            },
            SampleConsumer {
                consumer: self.consumer,
            },
        )
    }
}

/// Write half, owned by the audio callback. Never blocks.
pub struct SampleProducer {
    producer: Producer<i16>,
}

impl SampleProducer {
    /// Writes as many samples as fit and returns that count. Anything the
    /// caller could not place is dropped audio; the caller decides whether
    /// to count or log it, this path must stay allocation and syscall free.
    pub fn write(&mut self, samples: &[i16]) -> usize {
        let writable = samples.len().min(self.producer.slots());
        if writable == 0 {
            return 0;
        }
        let mut chunk = match self.producer.write_chunk(writable) {
            Ok(chunk) => chunk,
            Err(_) => return 0,
        };

        // The chunk may wrap; fill both slices.
        let (first, second) = chunk.as_mut_slices();
        let split = first.len();
        first.copy_from_slice(&samples[..split]);
        if !second.is_empty() {
            second.copy_from_slice(&samples[split..writable]);
        }
        chunk.commit_all();
        writable
    }

    /// Free slots remaining.
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

/// Read half, owned by the frame reader.
pub struct SampleConsumer {
    consumer: Consumer<i16>,
}

impl SampleConsumer {
    /// Reads up to `buffer.len()` samples, returning how many were copied.
    pub fn read(&mut self, buffer: &mut [i16]) -> usize {
        let readable = buffer.len().min(self.consumer.slots());
        if readable == 0 {
            return 0;
        }
        let chunk = match self.consumer.read_chunk(readable) {
            Ok(chunk) => chunk,
            Err(_) => return 0,
        };

        let (first, second) = chunk.as_slices();
        let split = first.len();
        buffer[..split].copy_from_slice(first);
        if !second.is_empty() {
            buffer[split..split + second.len()].copy_from_slice(second);
        }
        chunk.commit_all();
        readable
    }

    /// Samples waiting to be read.
    pub fn slots(&self) -> usize {
        self.consumer.slots()
    }
}
