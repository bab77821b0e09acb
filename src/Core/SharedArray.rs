// Shared array backends for the broadcast medium.
// Heap slots for agents living in one process, /dev/shm + mmap for agents in separate processes.

use std::fmt::Debug;
use std::io;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

/// The fixed-length array of 16-bit slots every agent reads and writes.
///
/// There is no locking at this level: a slot load or store is a single atomic
/// word access, and any agent may touch any slot. Turn exclusivity is the
/// engine's business, not the backend's.
pub trait SharedArrayBackend: Send + Sync + Debug {
    /// Number of slots in the array (N).
    fn len(&self) -> usize;

    /// Read the word at `index`.
    fn load(&self, index: usize) -> u16;

    /// Overwrite the word at `index`.
    fn store(&self, index: usize, word: u16);

    /// Get the underlying handle (heap or file descriptor)
    fn raw_handle(&self) -> RawHandle;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every slot, in index order.
    fn words(&self) -> Vec<u16> {
        (0..self.len()).map(|i| self.load(i)).collect()
    }
}

/// Platform-specific handle type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawHandle {
    /// Process-local heap allocation
    Heap,
    /// Unix file descriptor (Linux)
    Fd(i32),
}

/// Process-local shared array, one atomic word per slot.
#[derive(Debug)]
pub struct HeapSharedArray {
    slots: Box<[AtomicU16]>,
}

impl HeapSharedArray {
    /// Create a zeroed array of `len` slots.
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| AtomicU16::new(0)).collect(),
        }
    }
}

impl SharedArrayBackend for HeapSharedArray {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn load(&self, index: usize) -> u16 {
        self.slots[index].load(Ordering::Acquire)
    }

    fn store(&self, index: usize, word: u16) {
        self.slots[index].store(word, Ordering::Release);
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::Heap
    }
}

/// Create a new shared array of `len` slots.
///
/// # Arguments
/// * `len` - Number of 16-bit slots
/// * `name` - `None` for a heap array, `Some(name)` for `/dev/shm/<name>` (Linux only)
pub fn create_shared_array(len: usize, name: Option<&str>) -> io::Result<Arc<dyn SharedArrayBackend>> {
    match name {
        None => Ok(Arc::new(HeapSharedArray::new(len))),
        Some(name) => create_named(len, name),
    }
}

/// Attach to a shared array previously created under `/dev/shm/<name>`.
///
/// The file must hold at least `len` slots.
pub fn attach_shared_array(name: &str, len: usize) -> io::Result<Arc<dyn SharedArrayBackend>> {
    attach_named(name, len)
}

#[cfg(target_os = "linux")]
fn create_named(len: usize, name: &str) -> io::Result<Arc<dyn SharedArrayBackend>> {
    Ok(Arc::new(LinuxSharedArray::create(len, name)?))
}

#[cfg(target_os = "linux")]
fn attach_named(name: &str, len: usize) -> io::Result<Arc<dyn SharedArrayBackend>> {
    Ok(Arc::new(LinuxSharedArray::attach(name, len)?))
}

#[cfg(not(target_os = "linux"))]
fn create_named(_len: usize, _name: &str) -> io::Result<Arc<dyn SharedArrayBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Named shared arrays only supported on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
fn attach_named(_name: &str, _len: usize) -> io::Result<Arc<dyn SharedArrayBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Named shared arrays only supported on Linux",
    ))
}

#[cfg(target_os = "linux")]
pub use linux::LinuxSharedArray;

#[cfg(target_os = "linux")]
mod linux {
    use super::{RawHandle, SharedArrayBackend};
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::mem::size_of;
    use std::os::fd::{AsRawFd, IntoRawFd};
    use std::os::unix::fs::OpenOptionsExt;
    use std::ptr::{self, NonNull};
    use std::sync::atomic::{AtomicU16, Ordering};

    /// Shared array mapped from `/dev/shm/<name>`.
    #[derive(Debug)]
    pub struct LinuxSharedArray {
        ptr: NonNull<AtomicU16>,
        len: usize,
        map_size: usize,
        fd: i32,
    }

    unsafe impl Send for LinuxSharedArray {}
    unsafe impl Sync for LinuxSharedArray {}

    impl LinuxSharedArray {
        /// Create (or truncate) `/dev/shm/<name>` and map `len` zeroed slots.
        pub fn create(len: usize, name: &str) -> io::Result<Self> {
            let path = format!("/dev/shm/{}", name);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)
                .map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!("Failed to create shared array at {}: {}", path, e),
                    )
                })?;

            let map_size = len * size_of::<AtomicU16>();
            if unsafe { libc::ftruncate(file.as_raw_fd(), map_size as libc::off_t) } != 0 {
                return Err(io::Error::last_os_error());
            }

            Self::map(file, len, map_size)
        }

        /// Map an existing `/dev/shm/<name>` holding at least `len` slots.
        pub fn attach(name: &str, len: usize) -> io::Result<Self> {
            let path = format!("/dev/shm/{}", name);
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("Failed to open shared array at {}: {}", path, e),
                    )
                })?;

            let map_size = len * size_of::<AtomicU16>();
            let file_size = file.metadata()?.len() as usize;
            if file_size < map_size {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Shared array too small: expected at least {} bytes, got {}",
                        map_size, file_size
                    ),
                ));
            }

            Self::map(file, len, map_size)
        }

        fn map(file: File, len: usize, map_size: usize) -> io::Result<Self> {
            if map_size == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Shared array must hold at least one slot",
                ));
            }

            let fd = file.into_raw_fd();
            let raw = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    map_size,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED,
                    fd,
                    0,
                )
            };

            if raw == libc::MAP_FAILED {
                let err = io::Error::last_os_error();
                unsafe { libc::close(fd) };
                return Err(err);
            }

            // mmap hands back page-aligned memory, so u16 alignment holds.
            let ptr = match NonNull::new(raw as *mut AtomicU16) {
                Some(ptr) => ptr,
                None => {
                    unsafe {
                        libc::munmap(raw, map_size);
                        libc::close(fd);
                    }
                    return Err(io::Error::new(io::ErrorKind::Other, "mmap returned null"));
                }
            };

            Ok(Self {
                ptr,
                len,
                map_size,
                fd,
            })
        }

        fn slot(&self, index: usize) -> &AtomicU16 {
            assert!(index < self.len, "slot {} out of range ({} slots)", index, self.len);
            unsafe { &*self.ptr.as_ptr().add(index) }
        }
    }

    impl Drop for LinuxSharedArray {
        fn drop(&mut self) {
            unsafe {
                libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.map_size);
                libc::close(self.fd);
            }
        }
    }

    impl SharedArrayBackend for LinuxSharedArray {
        fn len(&self) -> usize {
            self.len
        }

        fn load(&self, index: usize) -> u16 {
            self.slot(index).load(Ordering::Acquire)
        }

        fn store(&self, index: usize, word: u16) {
            self.slot(index).store(word, Ordering::Release);
        }

        fn raw_handle(&self) -> RawHandle {
            RawHandle::Fd(self.fd)
        }
    }
}
