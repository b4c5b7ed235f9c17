// File: src/object.rs
//
// The heap: string objects and the handle that stands in for a pointer.
// Every ObjString created during a VM's lifetime lives in `Heap::strings`
// and is freed in one shot when the Heap is dropped -- an owned object
// list, walked and freed at shutdown, without an intrusive linked list
// or unsafe pointers.

/// A stable index into `Heap::strings`. Two handles are equal iff they
/// name the same slot; combined with interning, byte-identical strings
/// always resolve to the same handle, so handle equality doubles as
/// content equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringHandle(u32);

/// A heap-allocated, interned byte string.
#[derive(Debug)]
pub struct ObjString {
    pub bytes: Box<[u8]>,
    pub hash: u32,
}

impl ObjString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// FNV-1a over raw bytes, 32-bit offset basis/prime from the original.
pub fn fnv1a_hash(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// Owns every `ObjString` allocated during one VM lifetime.
#[derive(Debug, Default)]
pub struct Heap {
    strings: Vec<ObjString>,
}

impl Heap {
    pub fn new() -> Self {
        Self { strings: Vec::new() }
    }

    pub fn get(&self, handle: StringHandle) -> &ObjString {
        &self.strings[handle.0 as usize]
    }

    /// Allocate a new, uninterned string. Callers that want interning
    /// semantics go through `Vm::intern_string` instead.
    pub fn allocate(&mut self, bytes: Box<[u8]>) -> StringHandle {
        let hash = fnv1a_hash(&bytes);
        self.strings.push(ObjString { bytes, hash });
        StringHandle((self.strings.len() - 1) as u32)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Interns `bytes`: returns the existing handle if an equal string is
/// already in `heap`, otherwise allocates one and records it in
/// `strings` so future calls find it. The value stored alongside the
/// key in `strings` is unused -- it exists only as a presence set.
pub fn intern(heap: &mut Heap, strings: &mut crate::table::Table, bytes: &[u8]) -> StringHandle {
    let hash = fnv1a_hash(bytes);
    if let Some(existing) = strings.find_string(heap, bytes, hash) {
        return existing;
    }
    let handle = heap.allocate(bytes.to_vec().into_boxed_slice());
    strings.set(heap, handle, crate::value::Value::Null);
    handle
}
