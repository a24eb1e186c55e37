use petgraph::Direction;
use roxmltree::{Document, Node, ParsingOptions};
use std::path::Path;

use crate::{config::GraphConfig, entity::Entity, error::GraphCacheError};

use super::EntityCodec;

#[derive(Debug, Clone, Default)]
pub struct XmlCodec {
    config: GraphConfig,
}

impl XmlCodec {
    pub fn new(config: GraphConfig) -> Self {
        XmlCodec { config }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn is_entity(&self, node: &Node) -> bool {
        node.is_element() && node.has_attribute(self.config.id_attribute.as_str())
    }

    fn is_reference(&self, node: &Node) -> bool {
        node.tag_name().name().ends_with(self.config.ref_suffix.as_str())
    }

    fn direction(&self, literal: &str) -> Option<Direction> {
        if literal == self.config.in_direction {
            Some(Direction::Incoming)
        } else if literal == self.config.out_direction {
            Some(Direction::Outgoing)
        } else {
            None
        }
    }

    /// Builds the entity for `node`. The id is taken verbatim, blank or not.
    fn extract_element(&self, node: Node, source: &str, line: u32) -> Entity {
        let id_attribute = self.config.id_attribute.as_str();
        let id = node.attribute(id_attribute).unwrap_or_default();

        let mut entity = Entity::new(id, source);
        entity.source_line = Some(line);
        entity.element_name = node.tag_name().name().to_string();
        entity.parent_id = node
            .ancestors()
            .skip(1)
            .find(|ancestor| self.is_entity(ancestor))
            .and_then(|ancestor| ancestor.attribute(id_attribute))
            .map(str::to_string);

        for attribute in node.attributes() {
            if attribute.name() == id_attribute {
                continue;
            }
            entity
                .attributes
                .insert_first(attribute.name(), attribute.value());
        }

        for child in node.children().filter(Node::is_element) {
            if self.is_reference(&child) {
                let target = child.attribute(self.config.ref_id_attribute.as_str());
                let direction = child.attribute(self.config.ref_direction_attribute.as_str());
                let (Some(target), Some(direction)) = (target, direction) else {
                    continue;
                };
                match self.direction(direction) {
                    Some(direction) => {
                        entity.declare_ref(direction, child.tag_name().name(), target)
                    }
                    None => tracing::trace!(
                        "{source}: ignoring <{}> with direction '{direction}'",
                        child.tag_name().name()
                    ),
                }
            } else if let Some(child_id) = child.attribute(id_attribute) {
                entity.child_ids.push(child_id.to_string());
            }
        }

        entity
    }
}

/// 1-based line numbers for byte offsets visited in increasing order. Each call only scans
/// the bytes since the previous offset.
struct LineCursor<'a> {
    text: &'a [u8],
    offset: usize,
    row: u32,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        LineCursor {
            text: text.as_bytes(),
            offset: 0,
            row: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> u32 {
        let offset = offset.min(self.text.len());
        if offset < self.offset {
            self.offset = 0;
            self.row = 1;
        }
        let newlines = self.text[self.offset..offset]
            .iter()
            .filter(|b| **b == b'\n')
            .count();
        self.row += newlines as u32;
        self.offset = offset;
        self.row
    }
}

impl EntityCodec for XmlCodec {
    fn extract(&self, content: &str, source: &Path) -> Result<Vec<Entity>, GraphCacheError> {
        let source_uri = source.to_string_lossy();
        let mut options = ParsingOptions::default();
        options.allow_dtd = true;
        let doc = Document::parse_with_options(content, options).map_err(|e| {
            GraphCacheError::extraction(source, Some(e.pos().row), e.to_string())
        })?;

        let mut lines = LineCursor::new(content);
        let entities: Vec<Entity> = doc
            .descendants()
            .filter(|n| self.is_entity(n))
            .map(|node| {
                let line = lines.line_at(node.range().start);
                self.extract_element(node, &source_uri, line)
            })
            .collect();
        tracing::trace!("{source_uri}: extracted {} entities", entities.len());
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn extract(content: &str) -> Result<Vec<Entity>, GraphCacheError> {
        XmlCodec::default().extract(content, Path::new("test.xml"))
    }

    #[test]
    fn elements_without_identifier_are_skipped() {
        let entities = extract(
            r#"<Root>
  <Person Guid="p1" Name="Alice"/>
  <Note Text="not an entity"/>
</Root>"#,
        )
        .unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, "p1");
        assert_eq!(entities[0].element_name, "Person");
        assert_eq!(entities[0].source_line, Some(2));
        assert_eq!(entities[0].source_uri, "test.xml");
        assert!(entities[0].parent_id.is_none());
    }

    #[test]
    fn parent_skips_unidentified_intermediate_elements() {
        let entities = extract(
            r#"<Family Guid="f1">
  <Members>
    <Person Guid="p1"/>
  </Members>
</Family>"#,
        )
        .unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].parent_id.as_deref(), Some("f1"));
        // Only direct children are declared as children.
        assert!(entities[0].child_ids.is_empty());
    }

    #[test]
    fn references_and_children_are_declared() {
        let entities = extract(
            r#"<Person Guid="p1" Name="Alice">
  <Person Guid="p2" Name="Bob"/>
  <ChildRef RefId="p3" RefDirection="out"/>
  <ChildRef RefId="p4" RefDirection="out"/>
  <Mother_Ref RefId="p0" RefDirection="in"/>
  <OwnerRef RefId="x" RefDirection="sideways"/>
  <OwnerRef RefId="y"/>
  <OwnerRef RefDirection="in"/>
  <FriendRef Guid="p5" RefId="p6" RefDirection="out"/>
</Person>"#,
        )
        .unwrap();
        let p1 = &entities[0];
        assert_eq!(p1.child_ids, vec!["p2"]);
        assert_eq!(p1.declared_out_refs["ChildRef"], vec!["p3", "p4"]);
        assert_eq!(p1.declared_out_refs["FriendRef"], vec!["p6"]);
        assert_eq!(p1.declared_in_refs["Mother_Ref"], vec!["p0"]);
        assert!(!p1.declared_in_refs.contains_key("OwnerRef"));
        assert!(!p1.declared_out_refs.contains_key("OwnerRef"));
        // A reference element carrying an identifier is still an entity of its own.
        assert!(entities.iter().any(|e| e.id == "p5"));
    }

    #[test]
    fn direction_literals_are_case_sensitive() {
        let entities =
            extract(r#"<A Guid="a"><LinkRef RefId="b" RefDirection="OUT"/></A>"#).unwrap();
        assert!(entities[0].declared_out_refs.is_empty());
        assert!(entities[0].declared_in_refs.is_empty());
    }

    #[test]
    fn identifier_is_excluded_from_attributes() {
        let entities = extract(r#"<Person Name="Alice" Guid="p1" Age="40"/>"#).unwrap();
        let attributes = &entities[0].attributes;
        assert!(!attributes.contains_key("Guid"));
        assert_eq!(attributes.keys().collect::<Vec<_>>(), vec!["Name", "Age"]);
    }

    #[test]
    fn malformed_document_fails_with_location() {
        let err = extract("<Person Guid=\"p1\">\n  <Broken>\n</Person>").unwrap_err();
        match err {
            GraphCacheError::Extraction { uri, line, .. } => {
                assert_eq!(uri, "test.xml");
                assert!(line.is_some());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn blank_identifier_is_kept_verbatim() {
        let entities = extract(r#"<Root><A Guid="a"/><B Guid="b"/><C Guid=""/></Root>"#).unwrap();
        let ids: Vec<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", ""]);
        assert_eq!(entities[2].element_name, "C");

        let entities = extract("<Root>\n  <A Guid=\"  \"><B Guid=\"b\"/></A>\n</Root>").unwrap();
        assert_eq!(entities[0].id, "  ");
        assert_eq!(entities[1].parent_id.as_deref(), Some("  "));
    }

    #[test]
    fn line_numbers_follow_document_order() {
        let mut content = String::from("<?xml version=\"1.0\"?>\n<Root>\n");
        for n in 0..500 {
            // Every third entity is preceded by a comment spanning two lines.
            if n % 3 == 0 {
                content.push_str("  <!-- note\n  -->\n");
            }
            content.push_str(&format!("  <Person Guid=\"p{n}\"\n    Name=\"n{n}\"/>\n"));
        }
        content.push_str("</Root>\n");

        let entities = extract(&content).unwrap();
        assert_eq!(entities.len(), 500);
        let mut expected = 3;
        for (n, entity) in entities.iter().enumerate() {
            if n % 3 == 0 {
                expected += 2;
            }
            assert_eq!(entity.id, format!("p{n}"));
            assert_eq!(entity.source_line, Some(expected), "line of {}", entity.id);
            expected += 2;
        }
    }

    #[test]
    fn line_numbers_on_a_single_line_document() {
        let mut content = String::from("<Root>");
        for n in 0..2000 {
            content.push_str(&format!("<Person Guid=\"p{n}\"/>"));
        }
        content.push_str("</Root>");
        let entities = extract(&content).unwrap();
        assert_eq!(entities.len(), 2000);
        assert!(entities.iter().all(|e| e.source_line == Some(1)));
    }

    #[test]
    fn line_cursor_restarts_when_moving_backwards() {
        let mut lines = LineCursor::new("a\nb\nc");
        assert_eq!(lines.line_at(4), 3);
        assert_eq!(lines.line_at(2), 2);
        assert_eq!(lines.line_at(99), 3);
    }

    #[test]
    fn custom_conventions_are_honoured() {
        let config = GraphConfig {
            id_attribute: "Id".to_string(),
            ref_suffix: "Link".to_string(),
            ref_id_attribute: "Target".to_string(),
            ref_direction_attribute: "Dir".to_string(),
            ..Default::default()
        };
        let entities = XmlCodec::new(config)
            .extract(
                r#"<Node Id="n1"><OwnerLink Target="n2" Dir="in"/><Node Id="n2"/></Node>"#,
                Path::new("custom.xml"),
            )
            .unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].declared_in_refs["OwnerLink"], vec!["n2"]);
        assert_eq!(entities[0].child_ids, vec!["n2"]);
    }
}
