//! Per-page annotation storage and the session-wide selection

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationBody, AnnotationId, AnnotationPatch};
use crate::error::{AnnotateError, Result};
use crate::geometry::{PixelPoint, PixelRect};

/// Smallest width and height, in pixels, an annotation may have
pub const MIN_SIZE_PX: f64 = 5.0;

/// Owns every annotation of a session.
///
/// Annotations are kept in creation order, which is also their z-order
/// (earliest is drawn first). Moving or resizing never reorders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationStore {
    next_id: u64,
    annotations: Vec<Annotation>,
    selected: Option<AnnotationId>,
    /// Bumped on every mutation
    revision: u64,
    min_size_px: f64,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(MIN_SIZE_PX)
    }
}

impl AnnotationStore {
    pub fn new(min_size_px: f64) -> Self {
        Self {
            next_id: 1,
            annotations: Vec::new(),
            selected: None,
            revision: 0,
            min_size_px,
        }
    }

    pub fn min_size_px(&self) -> f64 {
        self.min_size_px
    }

    /// Add an annotation. Fails with `DegenerateAnnotation` when either side
    /// is below the minimum size; callers treat that as a no-op.
    pub fn create(
        &mut self,
        page_index: u32,
        bounds: PixelRect,
        body: AnnotationBody,
    ) -> Result<AnnotationId> {
        if !bounds.is_finite() {
            return Err(AnnotateError::InvalidGeometry(format!(
                "non-finite annotation bounds {:?}",
                bounds
            )));
        }
        if bounds.width < self.min_size_px || bounds.height < self.min_size_px {
            return Err(AnnotateError::DegenerateAnnotation {
                width: bounds.width,
                height: bounds.height,
                min: self.min_size_px,
            });
        }

        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        self.annotations.push(Annotation {
            id,
            page_index,
            bounds,
            body,
        });
        self.revision += 1;
        tracing::debug!(%id, page_index, "annotation created");
        Ok(id)
    }

    /// Apply a partial update. Bounds smaller than the minimum are grown to
    /// the minimum, keeping the top-left corner.
    pub fn update(&mut self, id: AnnotationId, patch: AnnotationPatch) -> Result<()> {
        let min = self.min_size_px;
        let annotation = self
            .annotations
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AnnotateError::UnknownAnnotation(id))?;

        let mut changed = false;
        if let Some(bounds) = patch.bounds {
            if !bounds.is_finite() {
                return Err(AnnotateError::InvalidGeometry(format!(
                    "non-finite annotation bounds {:?}",
                    bounds
                )));
            }
            let clamped = PixelRect {
                width: bounds.width.max(min),
                height: bounds.height.max(min),
                ..bounds
            };
            changed |= annotation.bounds != clamped;
            annotation.bounds = clamped;
        }
        changed |= annotation.body.apply(&patch);

        if changed {
            self.revision += 1;
        }
        Ok(())
    }

    /// Replace an annotation's bounds without the minimum-size clamp. Used
    /// when the whole page view is rescaled or rotated.
    pub(crate) fn set_bounds_unchecked(&mut self, id: AnnotationId, bounds: PixelRect) -> Result<()> {
        let annotation = self
            .annotations
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AnnotateError::UnknownAnnotation(id))?;
        annotation.bounds = bounds;
        Ok(())
    }

    pub fn remove(&mut self, id: AnnotationId) -> Result<Annotation> {
        let pos = self
            .annotations
            .iter()
            .position(|a| a.id == id)
            .ok_or(AnnotateError::UnknownAnnotation(id))?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.revision += 1;
        Ok(self.annotations.remove(pos))
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Annotations of one page in z-order (earliest first)
    pub fn list_for_page(&self, page_index: u32) -> Vec<&Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.page_index == page_index)
            .collect()
    }

    pub fn all(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Topmost annotation on `page_index` containing `point`
    pub fn hit_test(&self, page_index: u32, point: PixelPoint) -> Option<&Annotation> {
        self.annotations
            .iter()
            .rev()
            .find(|a| a.page_index == page_index && a.bounds.contains(point))
    }

    /// Select an annotation, or clear the selection with `None`
    pub fn select(&mut self, id: Option<AnnotationId>) -> Result<()> {
        if let Some(id) = id {
            if self.get(id).is_none() {
                return Err(AnnotateError::UnknownAnnotation(id));
            }
        }
        self.selected = id;
        Ok(())
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Drop every annotation on a deleted page and shift later pages down by one
    pub fn remove_page(&mut self, page_index: u32) -> usize {
        let before = self.annotations.len();
        self.annotations.retain(|a| a.page_index != page_index);
        for annotation in &mut self.annotations {
            if annotation.page_index > page_index {
                annotation.page_index -= 1;
            }
        }
        if let Some(id) = self.selected {
            if self.get(id).is_none() {
                self.selected = None;
            }
        }
        let removed = before - self.annotations.len();
        self.revision += 1;
        removed
    }

    /// Remove everything. Ids keep counting up.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.selected = None;
        self.revision += 1;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> PixelRect {
        PixelRect::new(x, y, w, h)
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = AnnotationStore::default();
        assert!(store.is_empty());
        assert_eq!(store.revision(), 0);
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_degenerate_is_rejected() {
        let mut store = AnnotationStore::default();
        let err = store
            .create(0, rect(10.0, 10.0, 3.0, 3.0), AnnotationBody::redaction())
            .unwrap_err();
        assert!(matches!(err, AnnotateError::DegenerateAnnotation { .. }));
        assert!(store.is_empty());
        assert_eq!(store.revision(), 0);

        store
            .create(0, rect(10.0, 10.0, 6.0, 6.0), AnnotationBody::redaction())
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_exact_minimum_is_accepted() {
        let mut store = AnnotationStore::default();
        assert!(store
            .create(0, rect(0.0, 0.0, 5.0, 5.0), AnnotationBody::redaction())
            .is_ok());
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut store = AnnotationStore::default();
        let a = store.create(0, rect(0.0, 0.0, 10.0, 10.0), AnnotationBody::redaction()).unwrap();
        store.remove(a).unwrap();
        let b = store.create(0, rect(0.0, 0.0, 10.0, 10.0), AnnotationBody::redaction()).unwrap();
        assert_ne!(a, b);
        store.clear();
        let c = store.create(0, rect(0.0, 0.0, 10.0, 10.0), AnnotationBody::redaction()).unwrap();
        assert!(c > b);
    }

    #[test]
    fn test_update_clamps_to_minimum() {
        let mut store = AnnotationStore::default();
        let id = store.create(0, rect(10.0, 10.0, 50.0, 50.0), AnnotationBody::redaction()).unwrap();
        store.update(id, AnnotationPatch::bounds(rect(10.0, 10.0, 1.0, 0.0))).unwrap();
        assert_eq!(store.get(id).unwrap().bounds, rect(10.0, 10.0, 5.0, 5.0));
    }

    #[test]
    fn test_update_unknown_id() {
        let mut store = AnnotationStore::default();
        assert_eq!(
            store.update(AnnotationId(42), AnnotationPatch::default()),
            Err(AnnotateError::UnknownAnnotation(AnnotationId(42)))
        );
    }

    #[test]
    fn test_z_order_survives_updates() {
        let mut store = AnnotationStore::default();
        let a = store.create(0, rect(0.0, 0.0, 10.0, 10.0), AnnotationBody::redaction()).unwrap();
        let b = store.create(0, rect(20.0, 0.0, 10.0, 10.0), AnnotationBody::white_out()).unwrap();
        let c = store.create(1, rect(0.0, 0.0, 10.0, 10.0), AnnotationBody::redaction()).unwrap();

        store.update(a, AnnotationPatch::bounds(rect(100.0, 100.0, 40.0, 40.0))).unwrap();

        let ids: Vec<_> = store.list_for_page(0).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![a, b]);
        let ids: Vec<_> = store.list_for_page(1).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![c]);
    }

    #[test]
    fn test_hit_test_returns_topmost() {
        let mut store = AnnotationStore::default();
        let _below = store.create(0, rect(0.0, 0.0, 50.0, 50.0), AnnotationBody::redaction()).unwrap();
        let above = store.create(0, rect(25.0, 25.0, 50.0, 50.0), AnnotationBody::redaction()).unwrap();

        let hit = store.hit_test(0, PixelPoint::new(30.0, 30.0)).unwrap();
        assert_eq!(hit.id, above);
        assert!(store.hit_test(1, PixelPoint::new(30.0, 30.0)).is_none());
        assert!(store.hit_test(0, PixelPoint::new(200.0, 200.0)).is_none());
    }

    #[test]
    fn test_selection() {
        let mut store = AnnotationStore::default();
        let id = store.create(0, rect(0.0, 0.0, 10.0, 10.0), AnnotationBody::redaction()).unwrap();
        store.select(Some(id)).unwrap();
        assert_eq!(store.selected(), Some(id));

        assert!(store.select(Some(AnnotationId(999))).is_err());
        assert_eq!(store.selected(), Some(id));

        store.remove(id).unwrap();
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_remove_page_shifts_later_pages() {
        let mut store = AnnotationStore::default();
        store.create(0, rect(0.0, 0.0, 10.0, 10.0), AnnotationBody::redaction()).unwrap();
        let gone = store.create(1, rect(0.0, 0.0, 10.0, 10.0), AnnotationBody::redaction()).unwrap();
        let moved = store.create(2, rect(0.0, 0.0, 10.0, 10.0), AnnotationBody::redaction()).unwrap();
        store.select(Some(gone)).unwrap();

        assert_eq!(store.remove_page(1), 1);
        assert!(store.get(gone).is_none());
        assert_eq!(store.get(moved).unwrap().page_index, 1);
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_revision_tracks_changes() {
        let mut store = AnnotationStore::default();
        let id = store.create(0, rect(0.0, 0.0, 10.0, 10.0), AnnotationBody::text("a")).unwrap();
        let rev = store.revision();

        // No-op update leaves the revision alone
        store.update(id, AnnotationPatch::payload("a")).unwrap();
        assert_eq!(store.revision(), rev);

        store.update(id, AnnotationPatch::payload("b")).unwrap();
        assert_eq!(store.revision(), rev + 1);
    }
}
