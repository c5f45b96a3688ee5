use crate::types::SocketId;

/// One fixed position in a pool. `socket_id` is set exactly when `handle` is.
struct Slot<H> {
    handle: Option<H>,
    socket_id: Option<SocketId>,
}

impl<H> Slot<H> {
    const fn empty() -> Self {
        Self {
            handle: None,
            socket_id: None,
        }
    }

    fn is_free(&self) -> bool {
        self.socket_id.is_none()
    }
}

pub(crate) struct HandlePool<H, const N: usize> {
    slots: [Slot<H>; N],
}

impl<H, const N: usize> HandlePool<H, N> {
    pub(crate) fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::empty()),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_free()).count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.iter().all(Slot::is_free)
    }

    pub(crate) fn free_index(&self) -> Option<usize> {
        self.slots.iter().position(Slot::is_free)
    }

    fn index_of(&self, id: SocketId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.socket_id == Some(id))
    }

    pub(crate) fn contains(&self, id: SocketId) -> bool {
        self.index_of(id).is_some()
    }

    /// Binds `handle` to a slot from [`HandlePool::free_index`].
    pub(crate) fn occupy(&mut self, index: usize, id: SocketId, handle: H) {
        let slot = &mut self.slots[index];
        debug_assert!(slot.is_free());
        slot.handle = Some(handle);
        slot.socket_id = Some(id);
    }

    pub(crate) fn get(&self, id: SocketId) -> Option<&H> {
        let index = self.index_of(id)?;
        self.slots[index].handle.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: SocketId) -> Option<&mut H> {
        let index = self.index_of(id)?;
        self.slots[index].handle.as_mut()
    }

    /// Empties the slot holding `id` and hands its handle back.
    pub(crate) fn release(&mut self, id: SocketId) -> Option<H> {
        let index = self.index_of(id)?;
        let slot = &mut self.slots[index];
        slot.socket_id = None;
        slot.handle.take()
    }

    pub(crate) fn release_all(&mut self, mut release: impl FnMut(SocketId, H)) {
        for slot in self.slots.iter_mut() {
            let id = slot.socket_id.take();
            let handle = slot.handle.take();
            if let (Some(id), Some(handle)) = (id, handle) {
                release(id, handle);
            }
        }
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = SocketId> + '_ {
        self.slots.iter().filter_map(|slot| slot.socket_id)
    }
}
